//! The verification state machine.
//!
//! One [`VerificationSession`] exists per process and is advanced by
//! exactly one tick loop. Every input, including "no detection", has a
//! defined transition, so [`VerificationSession::tick`] never fails.

use super::config::VerificationConfig;
use super::reset::ResetController;
use super::state::{Outcome, RenderState, SessionState};
use crate::clock::Timestamp;
use crate::detection::{DetectionSample, Label};

/// Counters accumulated over the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Ticks processed.
    pub ticks: u64,
    /// Tracking runs started, including restarts after a label change.
    pub attempts_started: u64,
    /// Verifications that ended in [`Outcome::Success`].
    pub successes: u64,
    /// Verifications that ended in [`Outcome::Failed`].
    pub failures: u64,
    /// Tracking runs invalidated by a detection gap beyond the grace period.
    pub abandoned: u64,
    /// Explicit reset requests honored.
    pub resets_requested: u64,
    /// Samples rejected as malformed.
    pub invalid_samples: u64,
    /// Ticks whose timestamp was earlier than the previous tick.
    pub clock_regressions: u64,
}

/// Liveness verification session.
///
/// Consumes at most one detection sample per tick and decides whether a
/// single label has been held long enough to declare an outcome.
pub struct VerificationSession {
    config: VerificationConfig,
    state: SessionState,
    last_tick_at: Option<Timestamp>,
    last_render: RenderState,
    resets: ResetController,
    stats: SessionStats,
}

impl VerificationSession {
    /// Creates a session in [`SessionState::AwaitingFace`].
    ///
    /// The configuration is expected to have passed
    /// [`VerificationConfig::validate`].
    pub fn new(config: VerificationConfig) -> Self {
        Self::with_reset_controller(config, ResetController::new())
    }

    /// Creates a session that honors requests made through `resets`.
    pub fn with_reset_controller(config: VerificationConfig, resets: ResetController) -> Self {
        let last_render = RenderState::idle(config.verification_threshold_secs);
        Self {
            config,
            state: SessionState::AwaitingFace,
            last_tick_at: None,
            last_render,
            resets,
            stats: SessionStats::default(),
        }
    }

    /// Returns a handle other threads can use to request a reset.
    pub fn reset_controller(&self) -> ResetController {
        self.resets.clone()
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Configuration the session was created with.
    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Counters accumulated since creation.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The render state produced by the latest tick or reset.
    pub fn render(&self) -> RenderState {
        self.last_render
    }

    /// Immediately discards any tracking or notification and starts a
    /// fresh reset countdown.
    pub fn request_reset(&mut self) {
        let from = self.state.phase();
        self.stats.resets_requested += 1;
        self.enter_resetting();
        tracing::info!(from = %from, "Verification reset");
    }

    /// Applies one tick.
    ///
    /// `sample` is the best detection of the frame, if any. `now` must come
    /// from a monotonic clock; the countdown is decremented by the time
    /// actually elapsed since the previous tick.
    pub fn tick(&mut self, sample: Option<DetectionSample>, now: Timestamp) -> RenderState {
        self.stats.ticks += 1;
        let tick_secs = self.advance_tick_clock(now);

        if self.resets.take_pending() {
            self.request_reset();
            return self.last_render;
        }

        let sample = self.admit(sample);

        let render = match self.state {
            SessionState::AwaitingFace => match sample {
                Some(sample) => self.start_tracking(sample.label, now),
                None => RenderState::idle(self.config.verification_threshold_secs),
            },
            SessionState::Tracking {
                label,
                tracking_started_at,
                last_seen_at,
            } => self.continue_tracking(label, tracking_started_at, last_seen_at, sample, now),
            SessionState::Verified {
                outcome,
                verified_at,
            } => self.hold_notification(outcome, verified_at, now),
            SessionState::Resetting { remaining_secs } => self.count_down(remaining_secs, tick_secs),
        };

        self.last_render = render;
        render
    }

    /// Records `now` as the latest tick and returns the seconds since the
    /// previous one. A regression counts as zero elapsed time.
    fn advance_tick_clock(&mut self, now: Timestamp) -> f64 {
        let elapsed = match self.last_tick_at {
            Some(previous) => match now.checked_since(previous) {
                Some(d) => d.as_secs_f64(),
                None => {
                    self.stats.clock_regressions += 1;
                    tracing::warn!(
                        previous = %previous,
                        now = %now,
                        "Clock regression; treating tick as zero-length"
                    );
                    0.0
                }
            },
            None => 0.0,
        };
        self.last_tick_at = Some(self.high_water(now));
        elapsed
    }

    /// Latest time seen by the session; stored timestamps never move
    /// behind it.
    fn high_water(&self, now: Timestamp) -> Timestamp {
        self.last_tick_at.map_or(now, |t| t.max(now))
    }

    /// Drops malformed and sub-threshold samples.
    fn admit(&mut self, sample: Option<DetectionSample>) -> Option<DetectionSample> {
        let sample = sample?;
        if let Err(reason) = sample.validate() {
            self.stats.invalid_samples += 1;
            tracing::warn!(reason = %reason, "Rejected detection sample");
            return None;
        }
        sample
            .qualifies(self.config.confidence_threshold)
            .then_some(sample)
    }

    fn start_tracking(&mut self, label: Label, now: Timestamp) -> RenderState {
        let now = self.high_water(now);
        self.state = SessionState::Tracking {
            label,
            tracking_started_at: now,
            last_seen_at: now,
        };
        self.stats.attempts_started += 1;
        tracing::info!(label = %label, at = %now, "Tracking started");
        self.tracking_render(label, 0.0, false)
    }

    fn continue_tracking(
        &mut self,
        label: Label,
        started_at: Timestamp,
        last_seen_at: Timestamp,
        sample: Option<DetectionSample>,
        now: Timestamp,
    ) -> RenderState {
        match sample {
            Some(sample) if sample.label == label => {
                let elapsed = secs_since(now, started_at);
                if elapsed >= self.config.verification_threshold_secs {
                    return self.verify(label, elapsed, now);
                }
                self.state = SessionState::Tracking {
                    label,
                    tracking_started_at: started_at,
                    last_seen_at: last_seen_at.max(now),
                };
                tracing::trace!(label = %label, elapsed, "Tracking");
                self.tracking_render(label, elapsed, false)
            }
            Some(sample) => {
                tracing::info!(
                    from = %label,
                    to = %sample.label,
                    "Candidate label changed; restarting timer"
                );
                self.start_tracking(sample.label, now)
            }
            None => {
                let gap = secs_since(now, last_seen_at);
                if gap > self.config.no_face_grace_secs {
                    self.stats.abandoned += 1;
                    tracing::info!(label = %label, gap, "Face lost; attempt abandoned");
                    return self.enter_resetting();
                }
                let elapsed = secs_since(now, started_at);
                tracing::debug!(label = %label, gap, "No qualifying detection; within grace");
                self.tracking_render(label, elapsed, true)
            }
        }
    }

    fn verify(&mut self, label: Label, elapsed: f64, now: Timestamp) -> RenderState {
        let outcome = Outcome::for_label(label);
        self.state = SessionState::Verified {
            outcome,
            verified_at: self.high_water(now),
        };
        match outcome {
            Outcome::Success => self.stats.successes += 1,
            Outcome::Failed => self.stats.failures += 1,
        }
        tracing::info!(outcome = %outcome, label = %label, elapsed, "Verification complete");
        self.verified_render(outcome, 0.0)
    }

    fn hold_notification(
        &mut self,
        outcome: Outcome,
        verified_at: Timestamp,
        now: Timestamp,
    ) -> RenderState {
        let shown = secs_since(now, verified_at);
        if shown >= self.config.notification_duration_secs {
            tracing::debug!(outcome = %outcome, "Notification window closed");
            return self.enter_resetting();
        }
        self.verified_render(outcome, shown)
    }

    fn count_down(&mut self, remaining_secs: f64, tick_secs: f64) -> RenderState {
        let remaining = remaining_secs - tick_secs;
        if remaining <= 0.0 {
            self.state = SessionState::AwaitingFace;
            tracing::info!("Ready for a new verification");
            return RenderState::idle(self.config.verification_threshold_secs);
        }
        self.state = SessionState::Resetting {
            remaining_secs: remaining,
        };
        self.resetting_render(remaining)
    }

    fn enter_resetting(&mut self) -> RenderState {
        let remaining = self.config.reset_countdown_secs;
        self.state = SessionState::Resetting {
            remaining_secs: remaining,
        };
        self.last_render = self.resetting_render(remaining);
        self.last_render
    }

    fn tracking_render(&self, label: Label, elapsed: f64, face_missing: bool) -> RenderState {
        RenderState {
            phase: self.state.phase(),
            label: Some(label),
            elapsed_secs: Some(elapsed),
            outcome: None,
            remaining_countdown: None,
            face_missing,
            threshold_secs: self.config.verification_threshold_secs,
        }
    }

    fn verified_render(&self, outcome: Outcome, shown: f64) -> RenderState {
        RenderState {
            phase: self.state.phase(),
            label: None,
            elapsed_secs: Some(shown),
            outcome: Some(outcome),
            remaining_countdown: None,
            face_missing: false,
            threshold_secs: self.config.verification_threshold_secs,
        }
    }

    fn resetting_render(&self, remaining: f64) -> RenderState {
        RenderState {
            phase: self.state.phase(),
            label: None,
            elapsed_secs: Some((self.config.reset_countdown_secs - remaining).max(0.0)),
            outcome: None,
            remaining_countdown: Some(remaining),
            face_missing: false,
            threshold_secs: self.config.verification_threshold_secs,
        }
    }
}

/// Seconds from `earlier` to `now`, zero if the clock went backwards.
fn secs_since(now: Timestamp, earlier: Timestamp) -> f64 {
    now.saturating_since(earlier).as_secs_f64()
}

impl Default for VerificationSession {
    fn default() -> Self {
        Self::new(VerificationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Phase;

    fn at(secs: f64) -> Timestamp {
        Timestamp::from_secs_f64(secs)
    }

    fn sample(label: Label, confidence: f64, secs: f64) -> Option<DetectionSample> {
        Some(DetectionSample::new(label, confidence, at(secs)))
    }

    /// Feeds one sample per second for `from..=to`.
    fn feed(
        session: &mut VerificationSession,
        label: Label,
        from: u32,
        to: u32,
    ) -> Vec<RenderState> {
        (from..=to)
            .map(|t| session.tick(sample(label, 0.9, t as f64), at(t as f64)))
            .collect()
    }

    #[test]
    fn test_starts_awaiting_face() {
        let session = VerificationSession::default();
        assert_eq!(*session.state(), SessionState::AwaitingFace);
        assert_eq!(session.render().phase, Phase::Idle);
        assert!(session.render().elapsed_secs.is_none());
    }

    #[test]
    fn test_full_cycle_real() {
        let mut session = VerificationSession::default();

        let renders = feed(&mut session, Label::Real, 0, 10);
        for render in &renders[..10] {
            assert_eq!(render.phase, Phase::Tracking);
            assert!(render.outcome.is_none());
        }
        assert_eq!(renders[5].elapsed_secs, Some(5.0));

        let verified = renders[10];
        assert_eq!(verified.phase, Phase::Verified);
        assert_eq!(verified.outcome, Some(Outcome::Success));
        assert!(matches!(
            session.state(),
            SessionState::Verified {
                outcome: Outcome::Success,
                ..
            }
        ));

        assert_eq!(session.tick(None, at(11.0)).phase, Phase::Verified);
        assert_eq!(
            session.tick(sample(Label::Fake, 0.9, 12.0), at(12.0)).phase,
            Phase::Verified
        );

        let resetting = session.tick(None, at(13.0));
        assert_eq!(resetting.phase, Phase::Resetting);
        assert_eq!(resetting.remaining_countdown, Some(3.0));
        assert_eq!(
            *session.state(),
            SessionState::Resetting {
                remaining_secs: 3.0
            }
        );

        assert_eq!(session.tick(None, at(14.0)).remaining_countdown, Some(2.0));
        assert_eq!(session.tick(None, at(15.0)).remaining_countdown, Some(1.0));
        assert_eq!(session.tick(None, at(16.0)).phase, Phase::Idle);
        assert_eq!(*session.state(), SessionState::AwaitingFace);

        assert_eq!(session.stats().successes, 1);
        assert_eq!(session.stats().attempts_started, 1);
    }

    #[test]
    fn test_fake_outcome_fails() {
        let mut session = VerificationSession::default();
        let renders = feed(&mut session, Label::Fake, 0, 10);

        assert_eq!(renders[9].phase, Phase::Tracking);
        assert_eq!(renders[10].outcome, Some(Outcome::Failed));
        assert_eq!(session.stats().failures, 1);
    }

    #[test]
    fn test_sub_threshold_samples_ignored() {
        let mut session = VerificationSession::default();

        for t in 0..30 {
            let render = session.tick(sample(Label::Real, 0.5, t as f64), at(t as f64));
            assert_eq!(render.phase, Phase::Idle);
        }
        let render = session.tick(sample(Label::Real, 0.6, 30.0), at(30.0));
        assert_eq!(render.phase, Phase::Idle);
        assert_eq!(*session.state(), SessionState::AwaitingFace);
    }

    #[test]
    fn test_sub_threshold_sample_counts_as_gap_while_tracking() {
        let mut session = VerificationSession::default();
        session.tick(sample(Label::Real, 0.9, 0.0), at(0.0));

        let render = session.tick(sample(Label::Real, 0.4, 1.0), at(1.0));
        assert_eq!(render.phase, Phase::Tracking);
        assert!(render.face_missing);

        let render = session.tick(sample(Label::Real, 0.4, 2.5), at(2.5));
        assert_eq!(render.phase, Phase::Resetting);
        assert_eq!(session.stats().abandoned, 1);
    }

    #[test]
    fn test_label_switch_restarts_timer() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 0, 6);

        let render = session.tick(sample(Label::Fake, 0.9, 7.0), at(7.0));
        assert_eq!(render.label, Some(Label::Fake));
        assert_eq!(render.elapsed_secs, Some(0.0));

        // Without the restart, t=10 would already have verified.
        let renders = feed(&mut session, Label::Fake, 8, 16);
        assert!(renders.iter().all(|r| r.phase == Phase::Tracking));

        let render = session.tick(sample(Label::Fake, 0.9, 17.0), at(17.0));
        assert_eq!(render.outcome, Some(Outcome::Failed));
        assert_eq!(session.stats().attempts_started, 2);
    }

    #[test]
    fn test_gap_within_grace_keeps_start_time() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 0, 4);

        let render = session.tick(None, at(5.5));
        assert_eq!(render.phase, Phase::Tracking);
        assert!(render.face_missing);
        assert_eq!(render.elapsed_secs, Some(5.5));

        let render = session.tick(None, at(6.0));
        assert_eq!(render.phase, Phase::Tracking);

        let render = session.tick(sample(Label::Real, 0.9, 6.5), at(6.5));
        assert!(!render.face_missing);
        assert_eq!(render.elapsed_secs, Some(6.5));

        match session.state() {
            SessionState::Tracking {
                tracking_started_at,
                ..
            } => assert_eq!(*tracking_started_at, at(0.0)),
            other => panic!("unexpected state {other:?}"),
        }

        let renders = feed(&mut session, Label::Real, 7, 10);
        assert_eq!(renders[3].outcome, Some(Outcome::Success));
    }

    #[test]
    fn test_gap_exactly_grace_is_tolerated() {
        let mut session = VerificationSession::default();
        session.tick(sample(Label::Real, 0.9, 0.0), at(0.0));

        assert_eq!(session.tick(None, at(2.0)).phase, Phase::Tracking);
        assert_eq!(session.tick(None, at(2.25)).phase, Phase::Resetting);
    }

    #[test]
    fn test_gap_beyond_grace_forces_reset() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 0, 3);

        let render = session.tick(None, at(5.5));
        assert_eq!(render.phase, Phase::Resetting);
        assert_eq!(render.remaining_countdown, Some(3.0));
        assert!(render.label.is_none());
    }

    #[test]
    fn test_mid_tracking_reset_discards_progress() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 0, 5);

        session.request_reset();
        assert_eq!(
            *session.state(),
            SessionState::Resetting {
                remaining_secs: 3.0
            }
        );
        assert_eq!(session.render().phase, Phase::Resetting);

        // Countdown runs from the last tick at t=5.
        for t in 6..8 {
            let render = session.tick(sample(Label::Real, 0.9, t as f64), at(t as f64));
            assert_eq!(render.phase, Phase::Resetting);
        }
        assert_eq!(session.tick(None, at(8.0)).phase, Phase::Idle);

        let renders = feed(&mut session, Label::Real, 9, 18);
        assert!(renders.iter().all(|r| r.phase == Phase::Tracking));
        let render = session.tick(sample(Label::Real, 0.9, 19.0), at(19.0));
        assert_eq!(render.outcome, Some(Outcome::Success));
    }

    #[test]
    fn test_reset_is_idempotent_from_every_state() {
        let mut session = VerificationSession::default();
        let expected = SessionState::Resetting {
            remaining_secs: 3.0,
        };

        session.request_reset();
        assert_eq!(*session.state(), expected);
        session.request_reset();
        assert_eq!(*session.state(), expected);

        session.tick(None, at(0.0));
        session.tick(None, at(1.5));
        session.request_reset();
        assert_eq!(*session.state(), expected);

        session.tick(None, at(5.0));
        session.tick(sample(Label::Real, 0.9, 6.0), at(6.0));
        feed(&mut session, Label::Real, 7, 16);
        assert_eq!(session.render().phase, Phase::Verified);
        session.request_reset();
        assert_eq!(*session.state(), expected);
        assert_eq!(session.stats().resets_requested, 4);
    }

    #[test]
    fn test_controller_reset_applies_on_next_tick() {
        let mut session = VerificationSession::default();
        let controller = session.reset_controller();
        feed(&mut session, Label::Real, 0, 9);

        controller.request_reset();
        // The sample that would have verified is discarded.
        let render = session.tick(sample(Label::Real, 0.9, 10.0), at(10.0));
        assert_eq!(render.phase, Phase::Resetting);
        assert_eq!(render.remaining_countdown, Some(3.0));
        assert!(!controller.is_pending());
        assert_eq!(session.stats().successes, 0);

        assert_eq!(session.tick(None, at(11.0)).remaining_countdown, Some(2.0));
    }

    #[test]
    fn test_countdown_uses_measured_tick_duration() {
        let mut session = VerificationSession::default();
        session.tick(None, at(0.0));
        session.request_reset();

        // Irregular frame intervals still total the configured countdown.
        let r = session.tick(None, at(0.25));
        assert_eq!(r.remaining_countdown, Some(2.75));
        let r = session.tick(None, at(2.0));
        assert_eq!(r.remaining_countdown, Some(1.0));
        assert_eq!(r.elapsed_secs, Some(2.0));
        assert_eq!(session.tick(None, at(3.0)).phase, Phase::Idle);
    }

    #[test]
    fn test_notification_elapsed_exposed() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 0, 10);

        let render = session.tick(None, at(11.5));
        assert_eq!(render.phase, Phase::Verified);
        assert_eq!(render.elapsed_secs, Some(1.5));
        assert_eq!(render.progress(), 1.0);
    }

    #[test]
    fn test_invalid_sample_treated_as_none() {
        let mut session = VerificationSession::default();

        let render = session.tick(sample(Label::Real, 1.5, 0.0), at(0.0));
        assert_eq!(render.phase, Phase::Idle);
        let render = session.tick(sample(Label::Real, f64::NAN, 1.0), at(1.0));
        assert_eq!(render.phase, Phase::Idle);
        assert_eq!(session.stats().invalid_samples, 2);

        let render = session.tick(sample(Label::Real, 1.0, 2.0), at(2.0));
        assert_eq!(render.phase, Phase::Tracking);
    }

    #[test]
    fn test_clock_regression_counts_as_zero_elapsed() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 5, 8);

        let render = session.tick(sample(Label::Real, 0.9, 2.0), at(2.0));
        assert_eq!(render.phase, Phase::Tracking);
        assert_eq!(render.elapsed_secs, Some(0.0));
        assert_eq!(session.stats().clock_regressions, 1);

        let render = session.tick(None, at(1.0));
        assert_eq!(render.phase, Phase::Tracking);
    }

    #[test]
    fn test_single_backward_frame_keeps_tracking_alive() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 0, 8);

        session.tick(sample(Label::Real, 0.9, 2.0), at(2.0));
        let render = session.tick(None, at(8.5));
        assert_eq!(render.phase, Phase::Tracking);
        assert_eq!(render.elapsed_secs, Some(8.5));
        assert_eq!(session.stats().abandoned, 0);

        let render = session.tick(sample(Label::Real, 0.9, 10.0), at(10.0));
        assert_eq!(render.outcome, Some(Outcome::Success));
    }

    #[test]
    fn test_backward_label_switch_starts_at_latest_time() {
        let mut session = VerificationSession::default();
        feed(&mut session, Label::Real, 0, 8);

        session.tick(sample(Label::Fake, 0.9, 1.0), at(1.0));
        match session.state() {
            SessionState::Tracking {
                label,
                tracking_started_at,
                ..
            } => {
                assert_eq!(*label, Label::Fake);
                assert_eq!(*tracking_started_at, at(8.0));
            }
            other => panic!("unexpected state {other:?}"),
        }

        let render = session.tick(sample(Label::Fake, 0.9, 17.0), at(17.0));
        assert_eq!(render.phase, Phase::Tracking);
    }

    #[test]
    fn test_single_backward_frame_keeps_countdown() {
        let mut session = VerificationSession::default();
        session.tick(None, at(10.0));
        session.request_reset();

        session.tick(None, at(4.0));
        let render = session.tick(None, at(10.1));
        assert_eq!(render.phase, Phase::Resetting);
        let remaining = render.remaining_countdown.unwrap();
        assert!((remaining - 2.9).abs() < 1e-6);

        assert_eq!(session.tick(None, at(13.5)).phase, Phase::Idle);
    }

    #[test]
    fn test_clock_regression_does_not_advance_countdown() {
        let mut session = VerificationSession::default();
        session.tick(None, at(10.0));
        session.request_reset();

        let render = session.tick(None, at(4.0));
        assert_eq!(render.remaining_countdown, Some(3.0));
    }
}
