//! Session states and the per-tick render output.

use crate::clock::Timestamp;
use crate::detection::Label;
use serde::{Deserialize, Serialize};

/// Final result of a completed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// A real face was held for the full threshold.
    Success,
    /// A fake face was held for the full threshold.
    Failed,
}

impl Outcome {
    /// Outcome declared when `label` is held for the full threshold.
    pub fn for_label(label: Label) -> Self {
        match label {
            Label::Real => Outcome::Success,
            Label::Fake => Outcome::Failed,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failed => f.write_str("failed"),
        }
    }
}

/// Internal state of the verification session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    /// No active tracking; the next qualifying sample starts one.
    AwaitingFace,
    /// A candidate label is being timed for sustained presence.
    Tracking {
        /// Label being timed.
        label: Label,
        /// When the current run of `label` began.
        tracking_started_at: Timestamp,
        /// Latest qualifying sample of `label`.
        last_seen_at: Timestamp,
    },
    /// Threshold reached; the notification window is open.
    Verified {
        /// Declared result.
        outcome: Outcome,
        /// When the threshold was reached.
        verified_at: Timestamp,
    },
    /// Cosmetic delay before returning to [`SessionState::AwaitingFace`].
    Resetting {
        /// Countdown left before a new attempt.
        remaining_secs: f64,
    },
}

impl SessionState {
    /// Presenter-facing phase of this state.
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::AwaitingFace => Phase::Idle,
            SessionState::Tracking { .. } => Phase::Tracking,
            SessionState::Verified { .. } => Phase::Verified,
            SessionState::Resetting { .. } => Phase::Resetting,
        }
    }
}

/// Coarse phase shown to the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for a face.
    Idle,
    /// Timing a label.
    Tracking,
    /// Showing an outcome.
    Verified,
    /// Counting down to the next attempt.
    Resetting,
}

impl Phase {
    /// Stable numeric code, used as a metrics gauge value.
    pub fn code(&self) -> i64 {
        match self {
            Phase::Idle => 0,
            Phase::Tracking => 1,
            Phase::Verified => 2,
            Phase::Resetting => 3,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Tracking => "tracking",
            Phase::Verified => "verified",
            Phase::Resetting => "resetting",
        };
        f.write_str(name)
    }
}

/// What the presenter should show after a tick.
///
/// `elapsed_secs` means tracking time in [`Phase::Tracking`], notification
/// time in [`Phase::Verified`] and countdown time already spent in
/// [`Phase::Resetting`]. It is `None` in [`Phase::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Current phase.
    pub phase: Phase,
    /// Label being tracked, in [`Phase::Tracking`].
    pub label: Option<Label>,
    /// Phase-dependent elapsed time, see above.
    pub elapsed_secs: Option<f64>,
    /// Declared result, in [`Phase::Verified`].
    pub outcome: Option<Outcome>,
    /// Seconds left, in [`Phase::Resetting`].
    pub remaining_countdown: Option<f64>,
    /// Tracking continues through a detection gap this tick.
    pub face_missing: bool,
    /// Tracking time needed for an outcome, for progress display.
    pub threshold_secs: f64,
}

impl RenderState {
    pub(crate) fn idle(threshold_secs: f64) -> Self {
        Self {
            phase: Phase::Idle,
            label: None,
            elapsed_secs: None,
            outcome: None,
            remaining_countdown: None,
            face_missing: false,
            threshold_secs,
        }
    }

    /// Fraction of the verification threshold reached, in `[0, 1]`.
    ///
    /// Only tracking makes progress; a verified session is complete and
    /// every other phase reports zero.
    pub fn progress(&self) -> f64 {
        match self.phase {
            Phase::Tracking => match self.elapsed_secs {
                Some(elapsed) if self.threshold_secs > 0.0 => {
                    (elapsed / self.threshold_secs).clamp(0.0, 1.0)
                }
                _ => 0.0,
            },
            Phase::Verified => 1.0,
            Phase::Idle | Phase::Resetting => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_for_label() {
        assert_eq!(Outcome::for_label(Label::Real), Outcome::Success);
        assert_eq!(Outcome::for_label(Label::Fake), Outcome::Failed);
    }

    #[test]
    fn test_progress_clamps() {
        let mut render = RenderState::idle(10.0);
        assert_eq!(render.progress(), 0.0);

        render.phase = Phase::Tracking;
        render.elapsed_secs = Some(2.5);
        assert_eq!(render.progress(), 0.25);

        render.elapsed_secs = Some(12.0);
        assert_eq!(render.progress(), 1.0);
    }
}
