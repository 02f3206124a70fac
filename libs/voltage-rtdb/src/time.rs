//! Time provider abstraction for point commits
//!
//! Commits stamp points with "now" and the arbiter measures selection age,
//! so time acquisition is injected rather than read from the system clock
//! directly. Tests use a fixed or manually advanced clock.

use crate::point::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time provider trait for generating timestamps
pub trait TimeProvider: Send + Sync + 'static {
    /// Current time
    fn now(&self) -> Timestamp;
}

/// System time provider using local clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Timestamp {
        // A clock before the epoch reports as zero ("no time")
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Timestamp::from_millis(millis)
    }
}

/// Fixed time provider
///
/// Returns a predetermined timestamp. `FixedTimeProvider::default()` reports
/// zero, matching deployments that publish points without time.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedTimeProvider {
    timestamp: Timestamp,
}

impl FixedTimeProvider {
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp: Timestamp::from_millis(timestamp_ms),
        }
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Manually advanced clock for deterministic timeout tests
#[derive(Debug, Default)]
pub struct ManualTimeProvider {
    millis: AtomicU64,
}

impl ManualTimeProvider {
    pub fn new(start_ms: u64) -> Self {
        Self {
            millis: AtomicU64::new(start_ms),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, delta_ms: u64) {
        self.millis.fetch_add(delta_ms, Ordering::Relaxed);
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::Relaxed))
    }
}
