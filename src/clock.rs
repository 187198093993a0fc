//! Monotonic time for the tick loop.
//!
//! The session never reads a clock itself; every tick is handed the
//! current [`Timestamp`]. This keeps the state machine deterministic
//! and lets tests and simulations drive time explicitly.

use std::time::{Duration, Instant};

/// A point on a monotonic timeline, measured from an arbitrary origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The timeline origin.
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    /// Creates a timestamp `secs` seconds after the origin.
    ///
    /// Negative or non-finite values clamp to the origin, values too large
    /// for a `Duration` clamp to `Duration::MAX`.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
        } else {
            Self::ZERO
        }
    }

    /// Seconds since the origin.
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time elapsed since `earlier`, or `None` if `earlier` is later
    /// than `self` (clock regression).
    #[inline]
    pub fn checked_since(&self, earlier: Timestamp) -> Option<Duration> {
        self.0.checked_sub(earlier.0)
    }

    /// Time elapsed since `earlier`, clamped to zero on regression.
    #[inline]
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Source of monotonic time.
pub trait Clock {
    /// Returns the current time.
    fn now(&mut self) -> Timestamp;
}

/// Real monotonic clock anchored at construction time.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Starts a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&mut self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }
}

/// Simulated clock that advances a fixed step on every reading.
///
/// The first reading returns the start time; each later reading is one
/// step further along.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Timestamp,
    step: Duration,
    started: bool,
}

impl ManualClock {
    /// Creates a clock starting at the origin and stepping by `step`.
    pub fn new(step: Duration) -> Self {
        Self {
            current: Timestamp::ZERO,
            step,
            started: false,
        }
    }

    /// Creates a clock stepping at a fixed frame rate.
    pub fn with_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / f64::from(fps.max(1))))
    }

    /// Moves the clock forward without taking a reading.
    pub fn advance(&mut self, by: Duration) {
        self.current = self.current + by;
    }

    /// Returns the time of the latest reading.
    pub fn peek(&self) -> Timestamp {
        self.current
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Timestamp {
        if self.started {
            self.current = self.current + self.step;
        } else {
            self.started = true;
        }
        self.current
    }
}
