//! Clock abstraction for testable time
//!
//! Provides a trait for getting the current time in Farcaster seconds, with
//! implementations for real system time and mock time for testing.

use crate::message::FARCASTER_EPOCH;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for getting the current time in seconds since the Farcaster epoch.
pub trait Clock: Send + Sync {
    fn now_seconds(&self) -> u32;
}

/// Real system clock implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> u32 {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_secs();
        unix.saturating_sub(FARCASTER_EPOCH) as u32
    }
}

/// Mock clock for testing - returns a settable time.
#[derive(Debug, Default)]
pub struct MockClock {
    seconds: AtomicU32,
}

impl MockClock {
    pub fn new(seconds: u32) -> Self {
        Self {
            seconds: AtomicU32::new(seconds),
        }
    }

    pub fn set(&self, seconds: u32) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u32) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_seconds(&self) -> u32 {
        self.seconds.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_reasonable_time() {
        let clock = SystemClock;
        // Should be after 2025-01-01 in Farcaster seconds
        assert!(clock.now_seconds() > 126_230_400);
    }

    #[test]
    fn test_mock_clock_is_settable() {
        let clock = MockClock::new(12345);
        assert_eq!(clock.now_seconds(), 12345);
        clock.advance(5);
        assert_eq!(clock.now_seconds(), 12350);
        clock.set(100);
        assert_eq!(clock.now_seconds(), 100);
    }
}
