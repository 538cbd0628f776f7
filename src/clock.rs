use std::time::{Duration, Instant};

/// Time source used by the polling loops.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Block the calling thread only.
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
