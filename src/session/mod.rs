//! Liveness verification session.
//!
//! The session is a small state machine: it waits for a face, times how
//! long a single label is held, shows the outcome for a fixed window and
//! then counts down before accepting a new attempt.
//!
//! ```text
//! AwaitingFace ──sample──▶ Tracking ──threshold──▶ Verified
//!       ▲                     │                       │
//!       │                grace expired          window closed
//!       │                     ▼                       │
//!       └──countdown done── Resetting ◀───────────────┘
//! ```
//!
//! A reset request moves any state straight to `Resetting`.
//!
//! There is exactly one session per process, shared by every viewer of
//! the stream. Per-viewer isolation would mean one session per
//! connection and is deliberately not provided.

mod config;
mod machine;
mod reset;
mod state;

pub use config::{ConfigError, FileConfig, OutputConfig, StreamConfig, VerificationConfig};
pub use machine::{SessionStats, VerificationSession};
pub use reset::ResetController;
pub use state::{Outcome, Phase, RenderState, SessionState};
