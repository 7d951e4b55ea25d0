//! Per-command health and latency statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bulwark_common::time::{Clock, SystemClock};

use super::bucket::EventCounts;
use super::rolling_number::RollingNumber;
use super::rolling_percentile::{PercentileSnapshot, RollingPercentile};
use crate::command::event::EventType;
use crate::command::properties::CommandProperties;

/// Success/error totals over the rolling statistical window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthCounts {
    /// Errors plus successes
    pub total_count: u64,
    /// Failures, timeouts, short-circuits and rejections
    pub error_count: u64,
    /// `error_count * 100 / total_count`, or 0 with no traffic
    pub error_percentage: u32,
}

impl HealthCounts {
    fn from_counts(success: u64, error_count: u64) -> Self {
        let total_count = success.saturating_add(error_count);
        let error_percentage = if total_count == 0 {
            0
        } else {
            u32::try_from(error_count.saturating_mul(100) / total_count).unwrap_or(100)
        };
        Self { total_count, error_count, error_percentage }
    }
}

/// Rolling counters, latency percentiles, lifetime totals and the in-flight
/// gauge for one command key.
pub struct CommandMetrics<C: Clock = SystemClock> {
    key: String,
    group: String,
    counters: RollingNumber<C>,
    execution_times: RollingPercentile<C>,
    cumulative: [AtomicU64; EventType::COUNT],
    in_flight: AtomicU64,
}

impl<C: Clock> std::fmt::Debug for CommandMetrics<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandMetrics")
            .field("key", &self.key)
            .field("group", &self.group)
            .field("health", &self.health_counts())
            .field("in_flight", &self.current_execution_count())
            .finish()
    }
}

impl<C: Clock> CommandMetrics<C> {
    /// Build metrics whose window shapes come from `properties`.
    pub fn new(
        key: impl Into<String>,
        group: impl Into<String>,
        properties: &CommandProperties,
        clock: Arc<C>,
    ) -> Self {
        let counters = RollingNumber::new(
            properties.statistical_window(),
            properties.statistical_window_buckets() as usize,
            Arc::clone(&clock),
        );
        let execution_times = RollingPercentile::new(
            properties.percentile_window(),
            properties.percentile_window_buckets() as usize,
            properties.percentile_bucket_size() as usize,
            clock,
        );

        Self {
            key: key.into(),
            group: group.into(),
            counters,
            execution_times,
            cumulative: std::array::from_fn(|_| AtomicU64::new(0)),
            in_flight: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn increment_execution_count(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    pub fn decrement_execution_count(&self) {
        // Saturate so an unmatched decrement cannot wrap the gauge.
        let _ = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn current_execution_count(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Record one occurrence of `event` in the rolling window and the
    /// lifetime totals.
    pub fn mark(&self, event: EventType) {
        self.counters.increment(event);
        self.cumulative[event.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_success(&self) {
        self.mark(EventType::Success);
    }

    pub fn mark_failure(&self) {
        self.mark(EventType::Failure);
    }

    pub fn mark_timeout(&self) {
        self.mark(EventType::Timeout);
    }

    pub fn mark_short_circuited(&self) {
        self.mark(EventType::ShortCircuited);
    }

    pub fn mark_rejected(&self) {
        self.mark(EventType::SemaphoreRejected);
    }

    pub fn mark_fallback_success(&self) {
        self.mark(EventType::FallbackSuccess);
    }

    pub fn mark_fallback_failure(&self) {
        self.mark(EventType::FallbackFailure);
    }

    pub fn mark_fallback_rejection(&self) {
        self.mark(EventType::FallbackRejection);
    }

    pub fn mark_exception_thrown(&self) {
        self.mark(EventType::ExceptionThrown);
    }

    pub fn mark_bad_request(&self) {
        self.mark(EventType::BadRequest);
    }

    pub fn mark_response_from_cache(&self) {
        self.mark(EventType::ResponseFromCache);
    }

    /// Record one execution latency, truncated to whole milliseconds.
    pub fn add_execution_time(&self, elapsed: Duration) {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.execution_times.add_value(millis);
    }

    pub fn health_counts(&self) -> HealthCounts {
        let totals = self.counters.totals();
        let errors = EventType::ALL
            .iter()
            .filter(|e| e.is_error())
            .map(|&e| totals.get(e))
            .fold(0u64, u64::saturating_add);
        HealthCounts::from_counts(totals.get(EventType::Success), errors)
    }

    pub fn rolling_count(&self, event: EventType) -> u64 {
        self.counters.sum(event)
    }

    /// Rolling counts of every event type, read under one lock.
    pub fn rolling_counts(&self) -> EventCounts {
        self.counters.totals()
    }

    /// Occurrences of `event` since creation or the last [`reset`](Self::reset).
    pub fn cumulative_count(&self, event: EventType) -> u64 {
        self.cumulative[event.index()].load(Ordering::Relaxed)
    }

    pub fn execution_time_percentile(&self, percentile: f64) -> f64 {
        self.execution_times.percentile(percentile)
    }

    pub fn execution_time_mean(&self) -> f64 {
        self.execution_times.mean()
    }

    pub fn execution_time_snapshot(&self) -> Arc<PercentileSnapshot> {
        self.execution_times.snapshot()
    }

    /// Clear the rolling counters only, leaving latencies and lifetime
    /// totals untouched.
    pub fn reset_counters(&self) {
        self.counters.reset();
    }

    /// Clear every statistic except the in-flight gauge.
    pub fn reset(&self) {
        self.counters.reset();
        self.execution_times.reset();
        for total in &self.cumulative {
            total.store(0, Ordering::Relaxed);
        }
    }
}
