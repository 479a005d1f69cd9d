//! Time primitives.

use web_time::{SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Monotonic seconds since the start of a run.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Time(pub f64);

impl Time {
    pub fn seconds(self) -> f64 {
        self.0
    }
}

/// Source of UTC wall-clock time.
///
/// Only the time of day matters to consumers, so the trait exposes nothing
/// else. Swap in [`FixedUtcClock`] for deterministic tests.
pub trait UtcClock {
    /// Seconds elapsed since 00:00 UTC, in `[0, 86400)`.
    fn seconds_since_midnight(&self) -> f64;
}

/// Reads the host clock. Works natively and on `wasm32` (via `Date.now()`).
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemUtcClock;

impl UtcClock for SystemUtcClock {
    fn seconds_since_midnight(&self) -> f64 {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        since_epoch.rem_euclid(SECONDS_PER_DAY)
    }
}

/// A clock frozen at a given UTC time of day.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FixedUtcClock {
    seconds: f64,
}

impl FixedUtcClock {
    pub fn at_seconds(seconds: f64) -> Self {
        Self {
            seconds: seconds.rem_euclid(SECONDS_PER_DAY),
        }
    }

    pub fn at_hm(hours: u32, minutes: u32) -> Self {
        Self::at_seconds(f64::from(hours * 3_600 + minutes * 60))
    }
}

impl UtcClock for FixedUtcClock {
    fn seconds_since_midnight(&self) -> f64 {
        self.seconds
    }
}

impl<C: UtcClock + ?Sized> UtcClock for &C {
    fn seconds_since_midnight(&self) -> f64 {
        (**self).seconds_since_midnight()
    }
}
