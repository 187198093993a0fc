//! Liveness Gate Library
//!
//! Face-spoof liveness verification over a stream of per-frame
//! classifications. A classifier labels each frame's face as real or
//! fake; this crate decides, over time, whether one label has been held
//! steadily enough to declare an outcome.
//!
//! # Architecture
//!
//! ```text
//! DetectionSource → select_best → VerificationSession.tick → RenderState → Presenter
//!                                        ▲
//!                               ResetController
//! ```
//!
//! # Design Principles
//!
//! - **Sustained evidence**: a label must be held for the full threshold;
//!   switching labels restarts the timer
//! - **Tolerant of flicker**: short detection gaps inside the grace period
//!   do not restart an attempt
//! - **Measured time**: countdowns use the real interval between ticks
//! - **One session per process**: every viewer sees the same session
//!
//! # Example
//!
//! ```no_run
//! use liveness_gate::{
//!     clock::{Clock, ManualClock},
//!     detection::{select_best, DetectionSource, ScriptedSource},
//!     session::{Phase, VerificationSession},
//! };
//!
//! let mut source = ScriptedSource::from_scenario("real:0.9:301").unwrap();
//! let mut clock = ManualClock::with_fps(30);
//! let mut session = VerificationSession::default();
//!
//! while let Ok(detections) = source.next_detections() {
//!     let now = clock.now();
//!     let sample = select_best(&detections, session.config().confidence_threshold, now);
//!     let render = session.tick(sample, now);
//!     if render.phase == Phase::Verified {
//!         println!("{:?}", render.outcome);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod clock;
pub mod detection;
pub mod metrics;
pub mod presenter;
pub mod runtime;
pub mod session;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use detection::{Detection, DetectionSample, DetectionSource, Label, ScriptedSource};
pub use presenter::{Presenter, TextPresenter};
pub use runtime::{RunSummary, TickLoop};
pub use session::{
    Outcome, Phase, RenderState, ResetController, SessionState, VerificationConfig,
    VerificationSession,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
