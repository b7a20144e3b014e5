use std::cell::Cell;
use std::time::Instant;

/// Monotonic millisecond timestamp source. Implementations must never go backwards and must not
/// block.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// MonotonicClock reports wall-clock milliseconds since its creation.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    t_start: Instant,
}

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock {
            t_start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.t_start.elapsed().as_millis() as u64
    }
}

/// ManualClock only moves when told to. The headless driver advances it by one tick duration
/// per simulated frame.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> ManualClock {
        ManualClock {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new(500);
        assert_eq!(clock.now_ms(), 500);
        clock.advance(17);
        clock.advance(17);
        assert_eq!(clock.now_ms(), 534);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let t0 = clock.now_ms();
        let t1 = clock.now_ms();
        assert!(t1 >= t0);
    }
}
