use foundation::time::Time;

/// Deterministic frame metadata.
///
/// This is the primary timebase for the render loop. It is intentionally
/// small and pure so it can be recorded and replayed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Delta time since the previous frame (seconds).
    pub dt_s: f64,
    /// Loop time at the start of the frame (seconds).
    pub time: Time,
}

impl Frame {
    /// Fixed-step frame: time is derived from the index.
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    /// Frame stamped from a host clock (e.g. a `requestAnimationFrame` timestamp).
    ///
    /// A clock that steps backwards yields `dt_s == 0` rather than a negative delta.
    pub fn at(index: u64, time_s: f64, prev_time_s: Option<f64>) -> Self {
        let dt_s = prev_time_s.map_or(0.0, |prev| (time_s - prev).max(0.0));
        Self {
            index,
            dt_s,
            time: Time(time_s),
        }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}
