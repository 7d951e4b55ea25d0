//! Rolling command statistics
//!
//! - **[`rolling_number`]**: event counters over a trailing time window
//! - **[`rolling_percentile`]**: latency samples with a cached percentile
//!   snapshot
//! - **[`command_metrics`]**: the per-command aggregate the breaker and the
//!   metrics snapshot read from

mod bucket;
pub mod command_metrics;
pub mod rolling_number;
pub mod rolling_percentile;

pub use bucket::EventCounts;
pub use command_metrics::{CommandMetrics, HealthCounts};
pub use rolling_number::RollingNumber;
pub use rolling_percentile::{PercentileSnapshot, RollingPercentile, SNAPSHOT_PERCENTILES};
