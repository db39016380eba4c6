// Time sources

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::cell::Cell;

/// Source of the current time for the store
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Wall clock, truncated to millisecond precision so timestamps survive a
/// round trip through epoch-millisecond encodings unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    /// Clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::stepping(start, Duration::zero())
    }

    /// Clock that advances by `step` after every reading
    pub fn stepping(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Cell::new(start),
            step,
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.current.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.current.get();
        self.current.set(now + self.step);
        now
    }
}

/// Timestamp for a mutation of a record last touched at `previous`.
///
/// Always strictly later than `previous`, even when the clock has not moved
/// (or moved backwards) since. Saturates at the latest representable instant.
pub fn next_after(clock: &dyn Clock, previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = clock.now();
    if now > previous {
        now
    } else {
        previous.checked_add_signed(Duration::milliseconds(1)).unwrap_or(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
        // Should be reasonable timestamp (after year 2020)
        assert!(now.timestamp_millis() > 1_600_000_000_000);
    }

    #[test]
    fn test_manual_clock_frozen_and_stepping() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let frozen = ManualClock::new(start);
        assert_eq!(frozen.now(), start);
        assert_eq!(frozen.now(), start);

        let stepping = ManualClock::stepping(start, Duration::seconds(1));
        assert_eq!(stepping.now(), start);
        assert_eq!(stepping.now(), start + Duration::seconds(1));

        frozen.advance(Duration::minutes(5));
        assert_eq!(frozen.now(), start + Duration::minutes(5));
    }

    #[test]
    fn test_next_after_is_strictly_later() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);

        assert_eq!(next_after(&clock, start), start + Duration::milliseconds(1));

        let later = start + Duration::hours(1);
        assert_eq!(next_after(&clock, later), later + Duration::milliseconds(1));

        clock.set(later + Duration::hours(1));
        assert_eq!(next_after(&clock, later), later + Duration::hours(1));
    }

    #[test]
    fn test_next_after_saturates_at_max() {
        let max = DateTime::<Utc>::MAX_UTC;
        let clock = ManualClock::new(max);
        assert_eq!(next_after(&clock, max), max);

        let almost = max - Duration::milliseconds(1);
        assert_eq!(next_after(&ManualClock::new(almost), almost), max);
    }
}
