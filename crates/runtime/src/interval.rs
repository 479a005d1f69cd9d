/// Coarse periodic ticks, independent of the frame cadence.
///
/// `tick` resolves once per interval. It returns `false` when the timer has
/// been exhausted, which only headless timers do.
#[allow(async_fn_in_trait)]
pub trait IntervalTimer {
    async fn tick(&mut self) -> bool;
}

/// Headless timer: every `tick` resolves immediately until `ticks` are used up.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    remaining: u32,
    fired: u32,
}

impl ManualTimer {
    pub fn new(ticks: u32) -> Self {
        Self {
            remaining: ticks,
            fired: 0,
        }
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }
}

impl IntervalTimer for ManualTimer {
    async fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.fired += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{IntervalTimer, ManualTimer};

    #[test]
    fn manual_timer_fires_requested_ticks() {
        let mut timer = ManualTimer::new(2);
        pollster::block_on(async {
            assert!(timer.tick().await);
            assert!(timer.tick().await);
            assert!(!timer.tick().await);
        });
        assert_eq!(timer.fired(), 2);
    }
}
