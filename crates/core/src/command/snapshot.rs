//! Point-in-time metrics export for dashboards.
//!
//! Field names follow the Hystrix dashboard stream so existing consumers can
//! poll [`CommandRegistry::snapshots`](super::registry::CommandRegistry::snapshots)
//! and forward the JSON unchanged.

use std::collections::BTreeMap;

use bulwark_common::time::Clock;
use bulwark_common::CommonResult;
use serde::Serialize;

use super::event::EventType;
use super::registry::CommandHandle;

/// Percentiles exported in `latencyExecute` and `latencyTotal`.
pub const EXPORTED_PERCENTILES: [(&str, f64); 9] = [
    ("0", 0.0),
    ("25", 25.0),
    ("50", 50.0),
    ("75", 75.0),
    ("90", 90.0),
    ("95", 95.0),
    ("99", 99.0),
    ("99.5", 99.5),
    ("100", 100.0),
];

/// Active configuration as reported to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyValues {
    #[serde(rename = "propertyValue_circuitBreakerRequestVolumeThreshold")]
    pub circuit_breaker_request_volume_threshold: u64,
    #[serde(rename = "propertyValue_circuitBreakerSleepWindowInMilliseconds")]
    pub circuit_breaker_sleep_window_in_milliseconds: u64,
    #[serde(rename = "propertyValue_circuitBreakerErrorThresholdPercentage")]
    pub circuit_breaker_error_threshold_percentage: u32,
    #[serde(rename = "propertyValue_circuitBreakerForceOpen")]
    pub circuit_breaker_force_open: bool,
    #[serde(rename = "propertyValue_circuitBreakerForceClosed")]
    pub circuit_breaker_force_closed: bool,
    #[serde(rename = "propertyValue_executionIsolationStrategy")]
    pub execution_isolation_strategy: &'static str,
    #[serde(rename = "propertyValue_executionTimeoutInMilliseconds")]
    pub execution_timeout_in_milliseconds: u64,
    #[serde(rename = "propertyValue_executionIsolationSemaphoreMaxConcurrentRequests")]
    pub execution_isolation_semaphore_max_concurrent_requests: u32,
    #[serde(rename = "propertyValue_fallbackIsolationSemaphoreMaxConcurrentRequests")]
    pub fallback_isolation_semaphore_max_concurrent_requests: u32,
    #[serde(rename = "propertyValue_metricsRollingStatisticalWindowInMilliseconds")]
    pub metrics_rolling_statistical_window_in_milliseconds: u64,
    #[serde(rename = "propertyValue_metricsRollingPercentileWindowInMilliseconds")]
    pub metrics_rolling_percentile_window_in_milliseconds: u64,
}

/// Metrics of one command at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSnapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub group: String,
    /// Milliseconds since the UNIX epoch, from the registry clock
    pub current_time: u64,
    pub is_circuit_breaker_open: bool,
    pub error_percentage: u32,
    pub error_count: u64,
    pub request_count: u64,
    pub rolling_count_bad_requests: u64,
    pub rolling_count_exceptions_thrown: u64,
    pub rolling_count_failure: u64,
    pub rolling_count_fallback_failure: u64,
    pub rolling_count_fallback_rejection: u64,
    pub rolling_count_fallback_success: u64,
    pub rolling_count_responses_from_cache: u64,
    pub rolling_count_semaphore_rejected: u64,
    pub rolling_count_short_circuited: u64,
    pub rolling_count_success: u64,
    pub rolling_count_timeout: u64,
    pub current_concurrent_execution_count: u64,
    #[serde(rename = "latencyExecute_mean")]
    pub latency_execute_mean: f64,
    pub latency_execute: BTreeMap<String, f64>,
    #[serde(rename = "latencyTotal_mean")]
    pub latency_total_mean: f64,
    pub latency_total: BTreeMap<String, f64>,
    pub reporting_hosts: u32,
    #[serde(flatten)]
    pub properties: PropertyValues,
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl CommandSnapshot {
    pub fn capture<C: Clock>(handle: &CommandHandle<C>) -> Self {
        let metrics = handle.metrics();
        let properties = handle.properties();
        let counts = metrics.rolling_counts();
        let health = metrics.health_counts();
        let latencies = metrics.execution_time_snapshot();

        let latency: BTreeMap<String, f64> = EXPORTED_PERCENTILES
            .iter()
            .map(|&(label, p)| (label.to_string(), latencies.percentile(p)))
            .collect();

        Self {
            kind: "HystrixCommand",
            name: handle.key().to_string(),
            group: handle.group().to_string(),
            current_time: handle.clock().millis_since_epoch(),
            is_circuit_breaker_open: handle.breaker().is_open(),
            error_percentage: health.error_percentage,
            error_count: health.error_count,
            request_count: health.total_count,
            rolling_count_bad_requests: counts.get(EventType::BadRequest),
            rolling_count_exceptions_thrown: counts.get(EventType::ExceptionThrown),
            rolling_count_failure: counts.get(EventType::Failure),
            rolling_count_fallback_failure: counts.get(EventType::FallbackFailure),
            rolling_count_fallback_rejection: counts.get(EventType::FallbackRejection),
            rolling_count_fallback_success: counts.get(EventType::FallbackSuccess),
            rolling_count_responses_from_cache: counts.get(EventType::ResponseFromCache),
            rolling_count_semaphore_rejected: counts.get(EventType::SemaphoreRejected),
            rolling_count_short_circuited: counts.get(EventType::ShortCircuited),
            rolling_count_success: counts.get(EventType::Success),
            rolling_count_timeout: counts.get(EventType::Timeout),
            current_concurrent_execution_count: metrics.current_execution_count(),
            latency_execute_mean: latencies.mean(),
            latency_execute: latency.clone(),
            latency_total_mean: latencies.mean(),
            latency_total: latency,
            reporting_hosts: 1,
            properties: PropertyValues {
                circuit_breaker_request_volume_threshold: properties.request_volume_threshold(),
                circuit_breaker_sleep_window_in_milliseconds: millis(properties.sleep_window()),
                circuit_breaker_error_threshold_percentage: properties.error_threshold_percentage(),
                circuit_breaker_force_open: properties.force_open(),
                circuit_breaker_force_closed: properties.force_closed(),
                execution_isolation_strategy: "SEMAPHORE",
                execution_timeout_in_milliseconds: millis(properties.execution_timeout()),
                execution_isolation_semaphore_max_concurrent_requests: properties
                    .execution_max_concurrent_requests(),
                fallback_isolation_semaphore_max_concurrent_requests: properties
                    .fallback_max_concurrent_requests(),
                metrics_rolling_statistical_window_in_milliseconds: millis(
                    properties.statistical_window(),
                ),
                metrics_rolling_percentile_window_in_milliseconds: millis(
                    properties.percentile_window(),
                ),
            },
        }
    }

    pub fn to_json(&self) -> CommonResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
