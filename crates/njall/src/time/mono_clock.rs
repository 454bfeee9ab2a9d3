use crate::{TimeSource, UNIX_EPOCH};
use core::time::Duration;
use std::time::{Instant, SystemTime};

/// A monotonic time source that returns elapsed time since construction,
/// offset from a user-defined epoch.
///
/// The wall clock is read exactly once, at construction, to anchor the
/// timeline; afterwards time only advances by the elapsed [`Instant`]. This
/// avoids wall-clock adjustments (e.g., NTP steps) while still aligning
/// timestamps to a fixed origin, so the clock never goes backward.
///
/// Copies share the same anchor and therefore report the same timeline.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    epoch_offset: u64, // in milliseconds
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to the [`UNIX_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(UNIX_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using a custom epoch as the origin (t = 0),
    /// specified as a [`Duration`] since 1970-01-01 UTC.
    ///
    /// The current wall-clock time and the monotonic [`Instant`] are captured
    /// back-to-back; every later reading is the anchored offset plus the
    /// monotonic elapsed time. If the system clock reports a time before the
    /// epoch, the offset saturates at zero.
    ///
    /// # Example
    ///
    /// ```
    /// use njall::{MonotonicClock, TimeSource, UNIX_EPOCH};
    ///
    /// let clock = MonotonicClock::with_epoch(UNIX_EPOCH);
    /// let first: u64 = clock.current_millis();
    /// let second: u64 = clock.current_millis();
    ///
    /// assert!(second >= first);
    /// ```
    #[must_use]
    pub fn with_epoch(epoch: Duration) -> Self {
        let system_now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        let start = Instant::now();

        let offset = system_now.saturating_sub(epoch).as_millis();

        Self {
            start,
            epoch_offset: u64::try_from(offset).unwrap_or(u64::MAX),
        }
    }
}

impl TimeSource<u64> for MonotonicClock {
    /// Returns the number of milliseconds since the configured epoch, based on
    /// the elapsed monotonic time since construction.
    fn current_millis(&self) -> u64 {
        let elapsed = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_offset.saturating_add(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_goes_backward() {
        let clock = MonotonicClock::default();
        let mut last: u64 = clock.current_millis();
        for _ in 0..10_000 {
            let now: u64 = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn aligns_with_wall_clock() {
        let wall = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let now: u64 = MonotonicClock::default().current_millis();

        assert!(now.abs_diff(wall) < 1_000);
    }

    #[test]
    fn copies_share_one_timeline() {
        let clock = MonotonicClock::default();
        std::thread::sleep(Duration::from_millis(5));
        let copy = clock;

        let a: u64 = clock.current_millis();
        let b: u64 = copy.current_millis();
        assert!(b >= a);
        assert!(b - a < 1_000);
    }

    #[test]
    fn custom_epoch_shifts_origin() {
        let epoch = Duration::from_millis(1_000_000);
        let unix: u64 = MonotonicClock::default().current_millis();
        let shifted: u64 = MonotonicClock::with_epoch(epoch).current_millis();

        assert!(unix - shifted >= 999_000);
    }
}
