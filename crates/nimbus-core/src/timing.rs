//! Millisecond timing helpers shared by the fault indicator and the
//! coordinator.
//!
//! The node's monotonic clock is a free-running `u32` millisecond counter
//! that wraps after ~49.7 days. All comparisons go through [`elapsed_ms`],
//! which subtracts with wraparound, so no code ever compares two absolute
//! timestamps.

/// Milliseconds elapsed from `since` to `now`, correct across a counter wrap.
#[inline]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Truncate a 64-bit millisecond reading (e.g. `embassy_time::Instant::as_millis`)
/// to the wrapping 32-bit clock used by the core.
#[inline]
pub const fn wrap_millis(millis: u64) -> u32 {
    millis as u32
}

/// Fixed-interval scheduler for the outer polling loop.
///
/// The first call to [`IntervalTimer::is_due`] always fires so that the
/// first acquisition happens right after boot.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    interval_ms: u32,
    last_fired: Option<u32>,
}

impl IntervalTimer {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_fired: None,
        }
    }

    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Returns true (and re-arms) when at least one interval has passed
    /// since the last time it fired.
    pub fn is_due(&mut self, now: u32) -> bool {
        let due = match self.last_fired {
            None => true,
            Some(last) => elapsed_ms(now, last) >= self.interval_ms,
        };

        if due {
            self.last_fired = Some(now);
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_counter_wrap() {
        assert_eq!(elapsed_ms(5, u32::MAX - 4), 10);
        assert_eq!(elapsed_ms(1_000, 400), 600);
    }

    #[test]
    fn wrap_millis_keeps_low_bits() {
        assert_eq!(wrap_millis(u64::from(u32::MAX) + 11), 10);
    }

    #[test]
    fn interval_timer_fires_immediately_then_waits() {
        let mut timer = IntervalTimer::new(5_000);
        assert!(timer.is_due(100));
        assert!(!timer.is_due(5_099));
        assert!(timer.is_due(5_100));
        assert!(!timer.is_due(5_101));
    }

    #[test]
    fn interval_timer_across_wrap() {
        let mut timer = IntervalTimer::new(1_000);
        assert!(timer.is_due(u32::MAX - 499));
        assert!(!timer.is_due(u32::MAX));
        assert!(timer.is_due(500));
    }
}
