//! Logger metrics for observability
//!
//! Counters for dispatched, filtered and failed events.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_event_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dispatched();
/// metrics.record_driver_failure();
///
/// assert_eq!(metrics.dispatched(), 1);
/// assert_eq!(metrics.driver_failures(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Events that passed the threshold and were fanned out
    dispatched: AtomicU64,

    /// Calls dropped by the severity threshold
    filtered: AtomicU64,

    /// Individual driver calls that returned an error or panicked
    driver_failures: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            driver_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn driver_failures(&self) -> u64 {
        self.driver_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_driver_failure(&self) -> u64 {
        self.driver_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed driver calls per dispatched event, as a percentage
    ///
    /// Can exceed 100.0 when several drivers fail for the same event.
    /// Returns 0.0 if nothing has been dispatched.
    pub fn failure_rate(&self) -> f64 {
        let dispatched = self.dispatched() as f64;
        if dispatched == 0.0 {
            0.0
        } else {
            (self.driver_failures() as f64 / dispatched) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.driver_failures.store(0, Ordering::Relaxed);
    }
}

/// Alert on the first failure, then on every 1000th.
///
/// `previous` is the failure count before the one being reported.
#[inline]
pub(crate) fn should_alert(previous: u64) -> bool {
    previous == 0 || (previous + 1) % 1000 == 0
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dispatched: AtomicU64::new(self.dispatched()),
            filtered: AtomicU64::new(self.filtered()),
            driver_failures: AtomicU64::new(self.driver_failures()),
        }
    }
}
