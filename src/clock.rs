use std::thread;
use std::time::{Duration, Instant};

/// Timing primitives behind every poll loop and timeout in the driver.
pub trait Clock {
    type Instant: Copy;

    fn now(&self) -> Self::Instant;
    fn elapsed(&self, since: Self::Instant) -> Duration;
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by `std::time` and `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: Instant) -> Duration {
        since.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}
