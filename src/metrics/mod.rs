//! Prometheus metrics exporter for liveness verification.
//!
//! # Metrics Exposed
//!
//! ## Session State
//! - `liveness_gate_phase` - Current phase (0=idle, 1=tracking, 2=verified, 3=resetting)
//! - `liveness_gate_tracking_seconds` - Seconds the current label has been held
//! - `liveness_gate_frame_rate` - Smoothed tick rate
//!
//! ## Counters
//! - `liveness_gate_ticks_total` - Ticks processed
//! - `liveness_gate_attempts_total` - Tracking runs started
//! - `liveness_gate_verified_success_total` - Real-face verifications
//! - `liveness_gate_verified_failed_total` - Fake-face verifications
//! - `liveness_gate_abandoned_total` - Attempts lost to the grace period
//! - `liveness_gate_resets_total` - Explicit resets
//! - `liveness_gate_invalid_samples_total` - Malformed samples
//! - `liveness_gate_clock_regressions_total` - Backwards timestamps
//!
//! # Example
//!
//! ```no_run
//! use liveness_gate::metrics::{MetricsRegistry, MetricsSnapshot};
//! use liveness_gate::session::VerificationSession;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let session = VerificationSession::default();
//!
//! registry.update(&MetricsSnapshot::from_session(&session));
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
