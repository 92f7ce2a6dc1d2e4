//! Clock abstraction for Roller.
//!
//! Rotation intervals, backup names, and retention ages all read the time
//! through this trait so tests can pin or advance it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for testing; holds a fixed time until moved explicitly.
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    /// Create a mock clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        if let Ok(delta) = chrono::Duration::from_std(by) {
            *now += delta;
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mock_clock_returns_fixed_time() {
        let t = Utc.with_ymd_and_hms(2016, 11, 4, 18, 30, 0).unwrap();
        let clock = MockClock::new(t);
        assert_eq!(clock.now(), t);
        assert_eq!(clock.now(), t);
    }

    #[test]
    fn test_mock_clock_advance_and_set() {
        let t = Utc.with_ymd_and_hms(2016, 11, 4, 18, 30, 0).unwrap();
        let clock = MockClock::new(t);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), t + chrono::Duration::milliseconds(1500));

        let later = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_system_clock_returns_reasonable_time() {
        let now = SystemClock.now();
        // After 2020-01-01 and before 2100-01-01
        assert!(now.timestamp() > 1_577_836_800);
        assert!(now.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_clock_trait_object() {
        let t = Utc.with_ymd_and_hms(2016, 11, 4, 18, 30, 0).unwrap();
        let mock: Box<dyn Clock> = Box::new(MockClock::new(t));
        assert_eq!(mock.now(), t);
    }
}
