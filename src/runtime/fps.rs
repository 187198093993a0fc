//! Frame-rate estimation from measured tick intervals.

use crate::clock::Timestamp;

/// Smoothing factor for the exponential moving average.
const EMA_ALPHA: f64 = 0.1;

/// Estimates the tick rate of the loop.
#[derive(Debug, Clone, Default)]
pub struct FpsMeter {
    first: Option<Timestamp>,
    last: Option<Timestamp>,
    frames: u64,
    smoothed: Option<f64>,
}

impl FpsMeter {
    /// Creates a meter with no frames recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame at `now` and returns the smoothed rate, once two
    /// frames have been seen.
    pub fn record(&mut self, now: Timestamp) -> Option<f64> {
        self.frames += 1;
        if self.first.is_none() {
            self.first = Some(now);
        }

        if let Some(last) = self.last.replace(now) {
            let interval = now.saturating_since(last).as_secs_f64();
            if interval > 0.0 {
                let instant = 1.0 / interval;
                self.smoothed = Some(match self.smoothed {
                    Some(prev) => prev + EMA_ALPHA * (instant - prev),
                    None => instant,
                });
            }
        }

        self.smoothed
    }

    /// Smoothed rate, if known.
    pub fn fps(&self) -> Option<f64> {
        self.smoothed
    }

    /// Average rate over every recorded frame.
    pub fn mean(&self) -> Option<f64> {
        let (first, last) = (self.first?, self.last?);
        let span = last.saturating_since(first).as_secs_f64();
        (span > 0.0).then(|| (self.frames - 1) as f64 / span)
    }

    /// Number of frames recorded.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
