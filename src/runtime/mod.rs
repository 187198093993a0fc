//! Tick loop plumbing around the session.

mod fps;
mod tick_loop;

pub use fps::FpsMeter;
pub use tick_loop::{RunSummary, StopReason, TickLoop, Verdict};
