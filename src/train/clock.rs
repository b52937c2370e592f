//! Wall-clock source for step and epoch timing

use std::time::Instant;

/// Monotonic time in seconds since an arbitrary origin
pub trait Clock {
    fn now(&self) -> f64;
}

/// Real monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
