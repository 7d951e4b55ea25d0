//! Time abstraction for testability
//!
//! Rolling statistics windows and circuit breakers are driven entirely by
//! "what time is it now". Routing every read through [`Clock`] lets
//! production code use the monotonic system clock while tests move time
//! forward explicitly with [`MockClock`].
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use bulwark_common::time::{Clock, MockClock, SystemClock};
//!
//! // Use system clock in production
//! let clock = SystemClock;
//! let _now = clock.now();
//!
//! // Use mock clock in tests
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.now().duration_since(start), Duration::from_secs(5));
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Trait for time operations to enable deterministic testing
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Implement Clock for Arc<T> where T: Clock for convenient sharing
impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time, so a clock handed to a registry can
/// still be advanced from the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Create a new mock clock with a specific start time
    pub fn with_current_time(start: Instant) -> Self {
        Self { start, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed = duration;
        }
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the system clock is monotonic across two reads.
    #[test]
    fn test_system_clock_now() {
        let clock = SystemClock;
        let now1 = clock.now();
        let now2 = clock.now();
        assert!(now2 >= now1, "System clock should advance");
    }

    #[test]
    fn test_mock_clock_new() {
        let clock = MockClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO, "New mock clock should start at zero");
    }

    /// Validates `MockClock::advance` moves `now()` by exactly the requested
    /// duration.
    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(5));
        clock.advance_millis(250);

        assert_eq!(clock.now().duration_since(start), Duration::from_millis(5250));
    }

    #[test]
    fn test_mock_clock_set_elapsed() {
        let clock = MockClock::new();

        clock.set_elapsed(Duration::from_secs(10));
        assert_eq!(clock.elapsed(), Duration::from_secs(10));

        clock.set_elapsed(Duration::from_secs(20));
        assert_eq!(clock.elapsed(), Duration::from_secs(20));
    }

    #[test]
    fn test_mock_clock_millis_since_epoch() {
        let clock = MockClock::new();
        clock.set_elapsed(Duration::from_millis(5000));

        assert_eq!(clock.millis_since_epoch(), 5000);
    }

    /// Validates clones share elapsed time.
    #[test]
    fn test_mock_clock_clone_shares_time() {
        let clock1 = MockClock::new();
        clock1.advance(Duration::from_secs(10));

        let clock2 = clock1.clone();
        clock2.advance(Duration::from_secs(5));

        assert_eq!(clock1.elapsed(), Duration::from_secs(15));
        assert_eq!(clock2.elapsed(), Duration::from_secs(15));
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock = Arc::new(MockClock::new());
        let start = clock.now();
        clock.advance(Duration::from_millis(10));
        assert_eq!(Clock::now(&clock).duration_since(start), Duration::from_millis(10));
    }
}
