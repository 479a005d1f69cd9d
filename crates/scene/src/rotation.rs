//! Time-of-day spin of the planet.

use std::cell::Cell;
use std::rc::Rc;

use foundation::time::UtcClock;
use runtime::IntervalTimer;
use tracing::debug;

/// Minutes of the UTC day per degree of spin (~1440 / 360.8).
pub const MINUTES_PER_DEGREE: f64 = 3.9907;

/// Real-time interval between refreshes.
pub const REFRESH_INTERVAL_SECS: u32 = 60;

/// World-rotation angle for a UTC time of day.
///
/// Only whole minutes count, so the value is constant within a minute.
pub fn world_rotation_degrees(seconds_since_midnight: f64, offset_deg: f64) -> f64 {
    let minutes = (seconds_since_midnight / 60.0).floor();
    minutes / MINUTES_PER_DEGREE + offset_deg
}

/// Shared handle to the world-rotation angle.
///
/// Written by the refresh task, read by the frame loop. Both run on the same
/// thread, so a `Cell` is enough; clones share the value.
#[derive(Debug, Clone, Default)]
pub struct RotationState {
    degrees: Rc<Cell<f64>>,
}

impl RotationState {
    pub fn new(degrees: f64) -> Self {
        Self {
            degrees: Rc::new(Cell::new(degrees)),
        }
    }

    pub fn from_clock(clock: &impl UtcClock, offset_deg: f64) -> Self {
        Self::new(world_rotation_degrees(clock.seconds_since_midnight(), offset_deg))
    }

    pub fn degrees(&self) -> f64 {
        self.degrees.get()
    }

    pub fn radians(&self) -> f64 {
        self.degrees().to_radians()
    }

    pub fn set(&self, degrees: f64) {
        self.degrees.set(degrees);
    }

    pub fn refresh(&self, clock: &impl UtcClock, offset_deg: f64) {
        self.set(world_rotation_degrees(clock.seconds_since_midnight(), offset_deg));
    }
}

/// Recomputes `state` from `clock` on every timer tick.
///
/// Runs until the timer is exhausted, which only happens for headless timers.
pub async fn run_rotation_refresh<C, T>(state: RotationState, clock: C, offset_deg: f64, mut timer: T)
where
    C: UtcClock,
    T: IntervalTimer,
{
    while timer.tick().await {
        state.refresh(&clock, offset_deg);
        debug!(degrees = state.degrees(), "world rotation refreshed");
    }
}

#[cfg(test)]
mod tests {
    use super::{RotationState, run_rotation_refresh, world_rotation_degrees};
    use foundation::time::FixedUtcClock;
    use runtime::ManualTimer;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn midnight_is_the_offset() {
        assert_close(world_rotation_degrees(0.0, 90.0), 90.0);
    }

    #[test]
    fn only_whole_minutes_count() {
        let at_noon = world_rotation_degrees(12.0 * 3600.0, 90.0);
        assert_close(at_noon, 720.0 / 3.9907 + 90.0);
        assert_eq!(world_rotation_degrees(12.0 * 3600.0 + 59.0, 90.0), at_noon);
    }

    #[test]
    fn refresh_task_updates_shared_state() {
        let state = RotationState::from_clock(&FixedUtcClock::at_hm(0, 0), 90.0);
        let reader = state.clone();
        assert_close(reader.degrees(), 90.0);

        let clock = FixedUtcClock::at_hm(6, 0);
        pollster::block_on(run_rotation_refresh(
            state,
            clock,
            90.0,
            ManualTimer::new(1),
        ));
        assert_close(reader.degrees(), 360.0 / 3.9907 + 90.0);
        assert_close(reader.radians(), reader.degrees().to_radians());
    }
}
