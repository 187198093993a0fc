//! The single tick loop that drives the verification session.
//!
//! Each iteration pulls one frame of detections, reduces it to at most
//! one sample, ticks the session and hands the render state to the
//! presenter. The loop is the session's only writer.

use super::fps::FpsMeter;
use crate::clock::{Clock, Timestamp};
use crate::detection::{select_best, DetectionSource, SourceError};
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::presenter::Presenter;
use crate::session::{Outcome, Phase, ResetController, SessionStats, VerificationSession};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Log the frame rate every this many ticks.
const FPS_LOG_INTERVAL: u64 = 90;

/// A completed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Declared result.
    pub outcome: Outcome,
    /// Wall-clock time the outcome was declared.
    pub decided_at: DateTime<Utc>,
    /// Loop time the outcome was declared.
    pub session_time: Timestamp,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The detection source has no more frames.
    Exhausted,
    /// The detection source failed.
    SourceFailed(String),
    /// Shutdown was requested.
    Shutdown,
    /// The configured tick limit was reached.
    TickLimit,
}

/// Summary returned when the loop ends.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Why the loop ended.
    pub stop_reason: StopReason,
    /// Outcomes declared during the run, in order.
    pub verdicts: Vec<Verdict>,
    /// Session counters at the end of the run.
    pub stats: SessionStats,
    /// Average tick rate, when at least two ticks ran.
    pub mean_fps: Option<f64>,
}

/// Drives a [`VerificationSession`] from a [`DetectionSource`].
pub struct TickLoop<S, C, P> {
    session: VerificationSession,
    source: S,
    clock: C,
    presenter: P,
    shutdown: Arc<AtomicBool>,
    pacing: Option<Duration>,
    tick_limit: Option<u64>,
    metrics: Option<Arc<MetricsRegistry>>,
    fps: FpsMeter,
    verdicts: Vec<Verdict>,
}

impl<S, C, P> TickLoop<S, C, P>
where
    S: DetectionSource,
    C: Clock,
    P: Presenter,
{
    /// Creates a loop with no pacing, no tick limit and no metrics.
    pub fn new(session: VerificationSession, source: S, clock: C, presenter: P) -> Self {
        Self {
            session,
            source,
            clock,
            presenter,
            shutdown: Arc::new(AtomicBool::new(false)),
            pacing: None,
            tick_limit: None,
            metrics: None,
            fps: FpsMeter::new(),
            verdicts: Vec::new(),
        }
    }

    /// Stops the loop once `flag` becomes true.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Sleeps `interval` after each tick, for sources that do not block
    /// on frame arrival.
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = Some(interval);
        self
    }

    /// Stops after `limit` ticks.
    pub fn with_tick_limit(mut self, limit: u64) -> Self {
        self.tick_limit = Some(limit);
        self
    }

    /// Publishes session metrics after every tick.
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// The driven session.
    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    /// The presenter receiving render states.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Handle for requesting resets from other threads.
    pub fn reset_controller(&self) -> ResetController {
        self.session.reset_controller()
    }

    /// Runs one iteration. Returns `Err` with the stop reason when the
    /// source can no longer supply frames.
    pub fn step(&mut self) -> Result<(), StopReason> {
        let detections = match self.source.next_detections() {
            Ok(detections) => detections,
            Err(SourceError::Exhausted) => return Err(StopReason::Exhausted),
            Err(e) => {
                tracing::warn!(error = %e, "Detection source failed; stopping");
                return Err(StopReason::SourceFailed(e.to_string()));
            }
        };

        let now = self.clock.now();
        let fps = self.fps.record(now);
        if self.fps.frames() % FPS_LOG_INTERVAL == 0 {
            tracing::debug!(fps = fps.unwrap_or(0.0), "Frame rate");
        }

        let sample = select_best(&detections, self.session.config().confidence_threshold, now);
        let previous = self.session.render().phase;
        let render = self.session.tick(sample, now);

        if render.phase == Phase::Verified && previous != Phase::Verified {
            if let Some(outcome) = render.outcome {
                self.verdicts.push(Verdict {
                    outcome,
                    decided_at: Utc::now(),
                    session_time: now,
                });
            }
        }

        self.presenter.present(&render);

        if let Some(registry) = &self.metrics {
            registry.update(&MetricsSnapshot::from_session(&self.session).with_frame_rate(fps));
        }

        Ok(())
    }

    /// Runs until the source is exhausted, shutdown is requested or the
    /// tick limit is reached.
    pub fn run(&mut self) -> RunSummary {
        let stop_reason = loop {
            if self.shutdown.load(Ordering::Acquire) {
                break StopReason::Shutdown;
            }
            if let Some(limit) = self.tick_limit {
                if self.session.stats().ticks >= limit {
                    break StopReason::TickLimit;
                }
            }
            if let Err(reason) = self.step() {
                break reason;
            }
            if let Some(interval) = self.pacing {
                std::thread::sleep(interval);
            }
        };

        tracing::info!(
            reason = ?stop_reason,
            ticks = self.session.stats().ticks,
            verdicts = self.verdicts.len(),
            "Tick loop stopped"
        );

        RunSummary {
            stop_reason,
            verdicts: self.verdicts.clone(),
            stats: *self.session.stats(),
            mean_fps: self.fps.mean(),
        }
    }
}
