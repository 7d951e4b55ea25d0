//! Live-updatable command properties.
//!
//! Readers on the hot path (breaker, semaphore, executor) load each value
//! with a relaxed atomic read; an update racing a read may be observed one
//! invocation late. Window shapes are fixed when the metrics are built and
//! are not affected by [`CommandProperties::update`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crate::config::CommandConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowShape {
    window: Duration,
    buckets: u32,
}

/// Atomic view of a [`CommandConfig`], shared by every component of a
/// command key.
#[derive(Debug)]
pub struct CommandProperties {
    execution_timeout_ms: AtomicU64,
    execution_timeout_interrupt: AtomicBool,
    execution_max_concurrent: AtomicU32,
    fallback_max_concurrent: AtomicU32,
    request_volume_threshold: AtomicU64,
    error_threshold_percentage: AtomicU32,
    sleep_window_ms: AtomicU64,
    force_open: AtomicBool,
    force_closed: AtomicBool,
    statistical: WindowShape,
    percentile: WindowShape,
    percentile_bucket_size: u32,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl CommandProperties {
    pub fn new(config: &CommandConfig) -> Self {
        Self {
            execution_timeout_ms: AtomicU64::new(millis(config.execution_timeout)),
            execution_timeout_interrupt: AtomicBool::new(config.execution_timeout_interrupt),
            execution_max_concurrent: AtomicU32::new(config.execution_max_concurrent_requests),
            fallback_max_concurrent: AtomicU32::new(config.fallback_max_concurrent_requests),
            request_volume_threshold: AtomicU64::new(config.circuit_breaker_request_volume_threshold),
            error_threshold_percentage: AtomicU32::new(
                config.circuit_breaker_error_threshold_percentage,
            ),
            sleep_window_ms: AtomicU64::new(millis(config.circuit_breaker_sleep_window)),
            force_open: AtomicBool::new(config.circuit_breaker_force_opened),
            force_closed: AtomicBool::new(config.circuit_breaker_force_closed),
            statistical: WindowShape {
                window: config.metrics_rolling_statistical_window,
                buckets: config.metrics_rolling_statistical_buckets,
            },
            percentile: WindowShape {
                window: config.metrics_rolling_percentile_window,
                buckets: config.metrics_rolling_percentile_buckets,
            },
            percentile_bucket_size: config.metrics_rolling_percentile_bucket_size,
        }
    }

    /// Apply new values in place. Window shapes and bucket size keep the
    /// values they were created with.
    pub fn update(&self, config: &CommandConfig) {
        self.execution_timeout_ms.store(millis(config.execution_timeout), Ordering::Relaxed);
        self.execution_timeout_interrupt
            .store(config.execution_timeout_interrupt, Ordering::Relaxed);
        self.execution_max_concurrent
            .store(config.execution_max_concurrent_requests, Ordering::Relaxed);
        self.fallback_max_concurrent
            .store(config.fallback_max_concurrent_requests, Ordering::Relaxed);
        self.request_volume_threshold
            .store(config.circuit_breaker_request_volume_threshold, Ordering::Relaxed);
        self.error_threshold_percentage
            .store(config.circuit_breaker_error_threshold_percentage, Ordering::Relaxed);
        self.sleep_window_ms.store(millis(config.circuit_breaker_sleep_window), Ordering::Relaxed);
        self.force_open.store(config.circuit_breaker_force_opened, Ordering::Relaxed);
        self.force_closed.store(config.circuit_breaker_force_closed, Ordering::Relaxed);
    }

    /// Read the current values back as a [`CommandConfig`].
    pub fn to_config(&self) -> CommandConfig {
        CommandConfig {
            execution_timeout: self.execution_timeout(),
            execution_timeout_interrupt: self.execution_timeout_interrupt(),
            execution_max_concurrent_requests: self.execution_max_concurrent_requests(),
            fallback_max_concurrent_requests: self.fallback_max_concurrent_requests(),
            circuit_breaker_request_volume_threshold: self.request_volume_threshold(),
            circuit_breaker_error_threshold_percentage: self.error_threshold_percentage(),
            circuit_breaker_sleep_window: self.sleep_window(),
            circuit_breaker_force_opened: self.force_open(),
            circuit_breaker_force_closed: self.force_closed(),
            metrics_rolling_statistical_window: self.statistical.window,
            metrics_rolling_statistical_buckets: self.statistical.buckets,
            metrics_rolling_percentile_window: self.percentile.window,
            metrics_rolling_percentile_buckets: self.percentile.buckets,
            metrics_rolling_percentile_bucket_size: self.percentile_bucket_size,
        }
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn execution_timeout_interrupt(&self) -> bool {
        self.execution_timeout_interrupt.load(Ordering::Relaxed)
    }

    pub fn execution_max_concurrent_requests(&self) -> u32 {
        self.execution_max_concurrent.load(Ordering::Relaxed)
    }

    pub fn fallback_max_concurrent_requests(&self) -> u32 {
        self.fallback_max_concurrent.load(Ordering::Relaxed)
    }

    pub fn request_volume_threshold(&self) -> u64 {
        self.request_volume_threshold.load(Ordering::Relaxed)
    }

    pub fn error_threshold_percentage(&self) -> u32 {
        self.error_threshold_percentage.load(Ordering::Relaxed)
    }

    pub fn sleep_window(&self) -> Duration {
        Duration::from_millis(self.sleep_window_ms.load(Ordering::Relaxed))
    }

    pub fn force_open(&self) -> bool {
        self.force_open.load(Ordering::Relaxed)
    }

    pub fn force_closed(&self) -> bool {
        self.force_closed.load(Ordering::Relaxed)
    }

    pub fn statistical_window(&self) -> Duration {
        self.statistical.window
    }

    pub fn statistical_window_buckets(&self) -> u32 {
        self.statistical.buckets
    }

    pub fn percentile_window(&self) -> Duration {
        self.percentile.window
    }

    pub fn percentile_window_buckets(&self) -> u32 {
        self.percentile.buckets
    }

    pub fn percentile_bucket_size(&self) -> u32 {
        self.percentile_bucket_size
    }
}

impl Default for CommandProperties {
    fn default() -> Self {
        Self::new(&CommandConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_config() {
        let config = CommandConfig::builder()
            .execution_timeout(Duration::from_millis(150))
            .execution_timeout_interrupt(false)
            .sleep_window(Duration::from_millis(900))
            .build()
            .expect("Should build config");

        assert_eq!(CommandProperties::new(&config).to_config(), config);
    }

    /// Validates updates change live values but not window shapes.
    #[test]
    fn test_update_keeps_window_shape() {
        let properties = CommandProperties::default();
        let updated = CommandConfig::builder()
            .execution_max_concurrent_requests(1)
            .force_open(true)
            .statistical_window(Duration::from_millis(2_000), 2)
            .build()
            .expect("Should build config");

        properties.update(&updated);

        assert_eq!(properties.execution_max_concurrent_requests(), 1);
        assert!(properties.force_open());
        assert_eq!(properties.statistical_window(), Duration::from_millis(10_000));
        assert_eq!(properties.statistical_window_buckets(), 10);
    }
}
