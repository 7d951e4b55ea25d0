//! Guarded command execution
//!
//! - **[`registry`]**: string-keyed store of per-command state
//! - **[`executor`]**: the one-shot orchestrator and the [`Command`] it runs
//! - **[`circuit_breaker`]**: statistics-driven OPEN/CLOSED state machine
//! - **[`semaphore`]**: execution and fallback bulkheads
//! - **[`metrics`]**: rolling counters and latency percentiles
//! - **[`properties`]**: live-updatable settings
//! - **[`snapshot`]**: dashboard export
//! - **[`error`]** / **[`event`]**: failure and outcome tags

pub mod circuit_breaker;
pub mod error;
pub mod event;
pub mod executor;
pub mod metrics;
pub mod properties;
pub mod registry;
pub mod semaphore;
pub mod snapshot;

pub use circuit_breaker::{Admission, CircuitBreaker, CircuitState};
pub use error::{CommandError, FailureType};
pub use event::EventType;
pub use executor::{Command, CommandExecutor, ExecutionRecord, FallbackContext};
pub use metrics::{CommandMetrics, HealthCounts, PercentileSnapshot};
pub use properties::CommandProperties;
pub use registry::{CommandHandle, CommandRegistry};
pub use semaphore::{CommandSemaphore, ExecutionPermit, FallbackPermit};
pub use snapshot::CommandSnapshot;
