//! Host-supplied monotonic time.
//!
//! The core never reads a clock itself. Every time-dependent operation takes a
//! `Millis` from the host's scheduler (frame timestamp, timer callback), which
//! keeps debounce, animation and timeout logic deterministic under test.

use std::ops::Add;

/// Milliseconds on the host's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Millis(u64);

impl Millis {
    /// Start of the host's timeline.
    pub const ZERO: Self = Self(0);

    /// Timestamp `ms` milliseconds into the timeline.
    pub const fn new(ms: u64) -> Self {
        Self(ms)
    }

    /// Raw milliseconds.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, saturating at zero if the clock went backwards.
    pub fn since(&self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for Millis {
    type Output = Millis;

    fn add(self, rhs: u64) -> Millis {
        Millis(self.0.saturating_add(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_saturates_when_clock_goes_backwards() {
        assert_eq!(Millis::new(100).since(Millis::new(250)), 0);
        assert_eq!(Millis::new(250).since(Millis::new(100)), 150);
    }

    #[test]
    fn add_saturates_at_max() {
        assert_eq!(Millis::new(u64::MAX) + 5, Millis::new(u64::MAX));
    }
}
