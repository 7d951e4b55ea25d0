//! # Bulwark Core
//!
//! Resilience execution engine: wraps a risky asynchronous operation (a
//! "command") with circuit breaking, semaphore bulkheads, timeout
//! enforcement, fallbacks and rolling health metrics.
//!
//! ## Architecture
//! - A [`CommandRegistry`] owns one [`CommandHandle`] per command key, created
//!   on first declaration and shared for the life of the registry
//! - Each invocation builds a fresh one-shot [`CommandExecutor`]
//! - Configuration comes from [`CommandConfig`], either in code or from a
//!   TOML/JSON file via [`config::loader`]
//!
//! ```
//! use bulwark_core::{Command, CommandConfig, CommandRegistry};
//!
//! # #[derive(Debug, thiserror::Error)]
//! # #[error("upstream unavailable")]
//! # struct Upstream;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = CommandRegistry::new();
//! registry
//!     .declare("inventory", "warehouse", CommandConfig::default())
//!     .expect("default config is valid");
//!
//! let stock = registry
//!     .execute("inventory", Command::new(|| async { Err::<u32, _>(Upstream) }).fallback(|_| async { Ok(0) }))
//!     .await;
//! assert_eq!(stock.ok(), Some(0));
//! # }
//! ```

pub mod command;
pub mod config;

pub use command::{
    CircuitState, Command, CommandError, CommandExecutor, CommandHandle, CommandRegistry,
    CommandSnapshot, EventType, FailureType, FallbackContext,
};
pub use config::{CommandConfig, CommandsFile, ConfigError};
