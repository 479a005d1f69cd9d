use crate::frame::Frame;

/// Cooperative per-frame scheduling.
///
/// Awaiting [`FrameScheduler::next_frame`] is the render loop's only
/// suspension point: the loop does its work for one frame, then yields until
/// the host is ready for the next one. Hosts tied to a display refresh never
/// return `None`; headless schedulers return `None` once they run out of
/// frames, which ends the loop.
#[allow(async_fn_in_trait)]
pub trait FrameScheduler {
    async fn next_frame(&mut self) -> Option<Frame>;
}

/// Headless scheduler yielding a bounded number of fixed-step frames.
#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    dt_s: f64,
    next_index: u64,
    remaining: u64,
}

impl FixedStepScheduler {
    pub fn new(dt_s: f64, frames: u64) -> Self {
        Self {
            dt_s,
            next_index: 0,
            remaining: frames,
        }
    }

    /// 60 Hz, the nominal display refresh.
    pub fn sixty_hz(frames: u64) -> Self {
        Self::new(1.0 / 60.0, frames)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl FrameScheduler for FixedStepScheduler {
    async fn next_frame(&mut self) -> Option<Frame> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let frame = Frame::new(self.next_index, self.dt_s);
        self.next_index += 1;
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedStepScheduler, FrameScheduler};
    use foundation::time::Time;

    #[test]
    fn yields_bounded_frames_in_order() {
        let mut sched = FixedStepScheduler::new(0.5, 3);
        let frames: Vec<_> = pollster::block_on(async {
            let mut out = Vec::new();
            while let Some(frame) = sched.next_frame().await {
                out.push(frame);
            }
            out
        });
        let indices: Vec<_> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(frames[2].time, Time(1.0));
        assert_eq!(sched.remaining(), 0);
    }

    #[test]
    fn exhausted_scheduler_stays_exhausted() {
        let mut sched = FixedStepScheduler::sixty_hz(0);
        assert!(pollster::block_on(sched.next_frame()).is_none());
        assert!(pollster::block_on(sched.next_frame()).is_none());
    }
}
