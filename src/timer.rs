//! Wall-clock timer.
//!
//! Measures host time only, on a monotonic clock, so it never synchronizes with the device and is
//! not affected by adjustments of the system clock.

use std::time::Instant;

/// Monotonic timer counting seconds since its creation.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    origin: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the timer was created.
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Seconds elapsed since `start`, a value previously returned by [`Timer::now`].
    pub fn since(&self, start: f64) -> f64 {
        (self.now() - start).max(0.0)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{thread, time::Duration};

    #[test]
    fn now_is_non_decreasing() {
        let timer = Timer::new();
        let mut last = timer.now();
        for _ in 0..1000 {
            let now = timer.now();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn resolves_milliseconds() {
        let timer = Timer::new();
        let start = timer.now();
        thread::sleep(Duration::from_millis(5));
        assert!(timer.since(start) >= 0.005);
    }
}
