//! Metrics collection and registry.

use crate::session::{Phase, VerificationSession};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Current phase code (see [`Phase::code`]).
    pub phase: i64,
    /// Seconds of tracking accumulated by the current attempt.
    pub tracking_secs: f64,
    /// Ticks processed.
    pub ticks: u64,
    /// Tracking runs started.
    pub attempts_started: u64,
    /// Successful verifications.
    pub successes: u64,
    /// Failed verifications.
    pub failures: u64,
    /// Attempts abandoned after the grace period.
    pub abandoned: u64,
    /// Explicit resets honored.
    pub resets_requested: u64,
    /// Malformed samples rejected.
    pub invalid_samples: u64,
    /// Clock regressions observed.
    pub clock_regressions: u64,
    /// Smoothed frame rate of the tick loop.
    pub frame_rate: Option<f64>,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the session's counters and latest render.
    pub fn from_session(session: &VerificationSession) -> Self {
        let render = session.render();
        let stats = session.stats();
        let tracking_secs = match render.phase {
            Phase::Tracking => render.elapsed_secs.unwrap_or(0.0),
            _ => 0.0,
        };

        Self {
            phase: render.phase.code(),
            tracking_secs,
            ticks: stats.ticks,
            attempts_started: stats.attempts_started,
            successes: stats.successes,
            failures: stats.failures,
            abandoned: stats.abandoned,
            resets_requested: stats.resets_requested,
            invalid_samples: stats.invalid_samples,
            clock_regressions: stats.clock_regressions,
            frame_rate: None,
        }
    }

    /// Adds the tick loop's frame rate.
    pub fn with_frame_rate(mut self, fps: Option<f64>) -> Self {
        self.frame_rate = fps;
        self
    }
}

/// Prometheus metrics registry for liveness verification.
pub struct MetricsRegistry {
    registry: Registry,

    // Session state
    phase: IntGauge,
    tracking_secs: Gauge,
    frame_rate: Gauge,

    // Counters
    ticks_total: IntCounter,
    attempts_total: IntCounter,
    success_total: IntCounter,
    failed_total: IntCounter,
    abandoned_total: IntCounter,
    resets_total: IntCounter,
    invalid_samples_total: IntCounter,
    clock_regressions_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let phase = IntGauge::new(
            "liveness_gate_phase",
            "Current phase (0=idle, 1=tracking, 2=verified, 3=resetting)",
        )?;
        let tracking_secs = Gauge::new(
            "liveness_gate_tracking_seconds",
            "Seconds the current candidate label has been held",
        )?;
        let frame_rate = Gauge::new(
            "liveness_gate_frame_rate",
            "Smoothed tick rate of the detection loop",
        )?;

        let ticks_total = IntCounter::new("liveness_gate_ticks_total", "Total ticks processed")?;
        let attempts_total = IntCounter::new(
            "liveness_gate_attempts_total",
            "Tracking runs started, including label-change restarts",
        )?;
        let success_total = IntCounter::new(
            "liveness_gate_verified_success_total",
            "Verifications that ended with a real face",
        )?;
        let failed_total = IntCounter::new(
            "liveness_gate_verified_failed_total",
            "Verifications that ended with a fake face",
        )?;
        let abandoned_total = IntCounter::new(
            "liveness_gate_abandoned_total",
            "Attempts invalidated by losing the face beyond the grace period",
        )?;
        let resets_total = IntCounter::new(
            "liveness_gate_resets_total",
            "Explicit reset requests honored",
        )?;
        let invalid_samples_total = IntCounter::new(
            "liveness_gate_invalid_samples_total",
            "Detection samples rejected as malformed",
        )?;
        let clock_regressions_total = IntCounter::new(
            "liveness_gate_clock_regressions_total",
            "Ticks whose timestamp went backwards",
        )?;

        registry.register(Box::new(phase.clone()))?;
        registry.register(Box::new(tracking_secs.clone()))?;
        registry.register(Box::new(frame_rate.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(attempts_total.clone()))?;
        registry.register(Box::new(success_total.clone()))?;
        registry.register(Box::new(failed_total.clone()))?;
        registry.register(Box::new(abandoned_total.clone()))?;
        registry.register(Box::new(resets_total.clone()))?;
        registry.register(Box::new(invalid_samples_total.clone()))?;
        registry.register(Box::new(clock_regressions_total.clone()))?;

        Ok(Self {
            registry,
            phase,
            tracking_secs,
            frame_rate,
            ticks_total,
            attempts_total,
            success_total,
            failed_total,
            abandoned_total,
            resets_total,
            invalid_samples_total,
            clock_regressions_total,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.phase.set(snapshot.phase);
        self.tracking_secs.set(snapshot.tracking_secs);
        if let Some(fps) = snapshot.frame_rate {
            self.frame_rate.set(fps);
        }

        // Counters only move forward; bump by the difference
        for (counter, value) in [
            (&self.ticks_total, snapshot.ticks),
            (&self.attempts_total, snapshot.attempts_started),
            (&self.success_total, snapshot.successes),
            (&self.failed_total, snapshot.failures),
            (&self.abandoned_total, snapshot.abandoned),
            (&self.resets_total, snapshot.resets_requested),
            (&self.invalid_samples_total, snapshot.invalid_samples),
            (&self.clock_regressions_total, snapshot.clock_regressions),
        ] {
            let current = counter.get();
            if value > current {
                counter.inc_by(value - current);
            }
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
