//! Command configuration.
//!
//! [`CommandConfig`] is the declarative, serde-friendly description of one
//! command's tunables. The registry turns it into live
//! [`CommandProperties`](crate::command::properties::CommandProperties) when
//! the command is declared; later updates go through
//! [`CommandRegistry::update_properties`](crate::command::registry::CommandRegistry::update_properties).
//!
//! Wire names follow the operator-facing camelCase options, with every
//! duration written in milliseconds:
//!
//! ```toml
//! [commands.inventory]
//! group = "warehouse"
//! executionTimeoutInMilliseconds = 250
//! circuitBreakerErrorThresholdPercentage = 40
//! ```

pub mod loader;

use std::collections::BTreeMap;
use std::time::Duration;

use bulwark_common::{duration_millis, CommonError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {format} configuration: {message}")]
    Parse { format: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

impl From<ConfigError> for CommonError {
    fn from(err: ConfigError) -> Self {
        CommonError::config(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables for a single command key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandConfig {
    /// Deadline raced against the operation. Zero disables the race.
    #[serde(rename = "executionTimeoutInMilliseconds", with = "duration_millis")]
    pub execution_timeout: Duration,

    /// Drop the operation when it times out. When `false` the operation runs
    /// as a detached task and its late result is discarded.
    pub execution_timeout_interrupt: bool,

    #[serde(rename = "executionIsolationSemaphoreMaxConcurrentRequests")]
    pub execution_max_concurrent_requests: u32,

    #[serde(rename = "fallbackIsolationSemaphoreMaxConcurrentRequests")]
    pub fallback_max_concurrent_requests: u32,

    /// Minimum requests in the statistical window before the breaker can trip.
    pub circuit_breaker_request_volume_threshold: u64,

    /// Error percentage at or above which the breaker trips.
    pub circuit_breaker_error_threshold_percentage: u32,

    #[serde(rename = "circuitBreakerSleepWindowInMilliseconds", with = "duration_millis")]
    pub circuit_breaker_sleep_window: Duration,

    pub circuit_breaker_force_opened: bool,

    pub circuit_breaker_force_closed: bool,

    #[serde(rename = "metricsRollingStatisticalWindowInMilliseconds", with = "duration_millis")]
    pub metrics_rolling_statistical_window: Duration,

    #[serde(rename = "metricsRollingStatisticalWindowBuckets")]
    pub metrics_rolling_statistical_buckets: u32,

    #[serde(rename = "metricsRollingPercentileWindowInMilliseconds", with = "duration_millis")]
    pub metrics_rolling_percentile_window: Duration,

    #[serde(rename = "metricsRollingPercentileWindowBuckets")]
    pub metrics_rolling_percentile_buckets: u32,

    /// Samples kept per percentile bucket before the oldest is overwritten.
    pub metrics_rolling_percentile_bucket_size: u32,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_millis(1_000),
            execution_timeout_interrupt: true,
            execution_max_concurrent_requests: 10,
            fallback_max_concurrent_requests: 10,
            circuit_breaker_request_volume_threshold: 20,
            circuit_breaker_error_threshold_percentage: 50,
            circuit_breaker_sleep_window: Duration::from_millis(5_000),
            circuit_breaker_force_opened: false,
            circuit_breaker_force_closed: false,
            metrics_rolling_statistical_window: Duration::from_millis(10_000),
            metrics_rolling_statistical_buckets: 10,
            metrics_rolling_percentile_window: Duration::from_millis(60_000),
            metrics_rolling_percentile_buckets: 6,
            metrics_rolling_percentile_bucket_size: 100,
        }
    }
}

impl CommandConfig {
    /// Create a configuration builder
    pub fn builder() -> CommandConfigBuilder {
        CommandConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        validate_window(
            "metricsRollingStatisticalWindow",
            self.metrics_rolling_statistical_window,
            self.metrics_rolling_statistical_buckets,
        )?;
        validate_window(
            "metricsRollingPercentileWindow",
            self.metrics_rolling_percentile_window,
            self.metrics_rolling_percentile_buckets,
        )?;

        if self.circuit_breaker_error_threshold_percentage > 100 {
            return Err(ConfigError::invalid(format!(
                "circuitBreakerErrorThresholdPercentage must be at most 100, got {}",
                self.circuit_breaker_error_threshold_percentage
            )));
        }

        if self.metrics_rolling_percentile_bucket_size == 0 {
            return Err(ConfigError::invalid(
                "metricsRollingPercentileBucketSize must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn validate_window(name: &str, window: Duration, buckets: u32) -> ConfigResult<()> {
    if buckets == 0 {
        return Err(ConfigError::invalid(format!("{name}Buckets must be greater than 0")));
    }

    let millis = window.as_millis();
    if millis == 0 {
        return Err(ConfigError::invalid(format!("{name}InMilliseconds must be greater than 0")));
    }

    if millis % u128::from(buckets) != 0 {
        return Err(ConfigError::invalid(format!(
            "{name}InMilliseconds ({millis}) must be divisible by {name}Buckets ({buckets})"
        )));
    }

    Ok(())
}

/// Builder for CommandConfig
#[derive(Debug, Default)]
pub struct CommandConfigBuilder {
    config: CommandConfig,
}

impl CommandConfigBuilder {
    pub fn new() -> Self {
        Self { config: CommandConfig::default() }
    }

    pub fn execution_timeout(mut self, timeout: Duration) -> Self {
        self.config.execution_timeout = timeout;
        self
    }

    pub fn execution_timeout_interrupt(mut self, interrupt: bool) -> Self {
        self.config.execution_timeout_interrupt = interrupt;
        self
    }

    pub fn execution_max_concurrent_requests(mut self, limit: u32) -> Self {
        self.config.execution_max_concurrent_requests = limit;
        self
    }

    pub fn fallback_max_concurrent_requests(mut self, limit: u32) -> Self {
        self.config.fallback_max_concurrent_requests = limit;
        self
    }

    pub fn request_volume_threshold(mut self, threshold: u64) -> Self {
        self.config.circuit_breaker_request_volume_threshold = threshold;
        self
    }

    pub fn error_threshold_percentage(mut self, percentage: u32) -> Self {
        self.config.circuit_breaker_error_threshold_percentage = percentage;
        self
    }

    pub fn sleep_window(mut self, window: Duration) -> Self {
        self.config.circuit_breaker_sleep_window = window;
        self
    }

    pub fn force_open(mut self, force: bool) -> Self {
        self.config.circuit_breaker_force_opened = force;
        self
    }

    pub fn force_closed(mut self, force: bool) -> Self {
        self.config.circuit_breaker_force_closed = force;
        self
    }

    pub fn statistical_window(mut self, window: Duration, buckets: u32) -> Self {
        self.config.metrics_rolling_statistical_window = window;
        self.config.metrics_rolling_statistical_buckets = buckets;
        self
    }

    pub fn percentile_window(mut self, window: Duration, buckets: u32) -> Self {
        self.config.metrics_rolling_percentile_window = window;
        self.config.metrics_rolling_percentile_buckets = buckets;
        self
    }

    pub fn percentile_bucket_size(mut self, size: u32) -> Self {
        self.config.metrics_rolling_percentile_bucket_size = size;
        self
    }

    pub fn build(self) -> ConfigResult<CommandConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// One entry of a [`CommandsFile`]: the group plus the command's tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDeclaration {
    pub group: String,
    #[serde(flatten)]
    pub config: CommandConfig,
}

/// A configuration document declaring commands by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandsFile {
    #[serde(default)]
    pub commands: BTreeMap<String, CommandDeclaration>,
}
