//! Reset requests from outside the tick loop.
//!
//! A keypress handler or UI button may ask for a reset at any moment,
//! possibly from another thread. The request is latched in a shared flag
//! and consumed by the session at the start of its next tick, so the tick
//! loop stays the only writer of session state and a reset can never be
//! lost to an in-flight tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle for requesting a session reset.
#[derive(Debug, Clone, Default)]
pub struct ResetController {
    pending: Arc<AtomicBool>,
}

impl ResetController {
    /// Creates a handle with no request pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a reset. Repeated requests before the next tick coalesce.
    pub fn request_reset(&self) {
        self.pending.store(true, Ordering::Release);
        tracing::debug!("Reset requested");
    }

    /// True if a request is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consumes a pending request, returning whether there was one.
    pub(crate) fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}
