//! Registry of command keys.
//!
//! Each key owns one [`CommandHandle`]: properties, metrics, breaker and
//! semaphore created together on first declaration and shared by every
//! invocation of that key afterwards. Registries are ordinary values, so
//! tests can build as many independent ones as they like and
//! [`CommandRegistry::reset`] gives a clean slate.

use std::sync::Arc;

use bulwark_common::time::{Clock, SystemClock};
use dashmap::DashMap;
use tracing::{debug, info};

use super::circuit_breaker::CircuitBreaker;
use super::error::CommandError;
use super::executor::{Command, CommandExecutor};
use super::metrics::CommandMetrics;
use super::properties::CommandProperties;
use super::semaphore::CommandSemaphore;
use super::snapshot::CommandSnapshot;
use crate::config::{CommandConfig, CommandsFile, ConfigError, ConfigResult};

/// Shared per-key state: everything an executor needs besides the command.
pub struct CommandHandle<C: Clock = SystemClock> {
    key: String,
    group: String,
    properties: Arc<CommandProperties>,
    metrics: Arc<CommandMetrics<C>>,
    breaker: CircuitBreaker<C>,
    semaphore: CommandSemaphore,
    clock: Arc<C>,
}

impl<C: Clock> std::fmt::Debug for CommandHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandle")
            .field("key", &self.key)
            .field("group", &self.group)
            .field("breaker", &self.breaker)
            .field("semaphore", &self.semaphore)
            .finish()
    }
}

impl<C: Clock> CommandHandle<C> {
    /// Wire up the components of one command key. `config` is assumed valid.
    pub fn new(
        key: impl Into<String>,
        group: impl Into<String>,
        config: &CommandConfig,
        clock: Arc<C>,
    ) -> Self {
        let key = key.into();
        let group = group.into();
        let properties = Arc::new(CommandProperties::new(config));
        let metrics = Arc::new(CommandMetrics::new(
            key.clone(),
            group.clone(),
            &properties,
            Arc::clone(&clock),
        ));
        let breaker = CircuitBreaker::new(
            key.clone(),
            Arc::clone(&properties),
            Arc::clone(&metrics),
            Arc::clone(&clock),
        );
        let semaphore = CommandSemaphore::new(Arc::clone(&properties));

        Self { key, group, properties, metrics, breaker, semaphore, clock }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn properties(&self) -> &Arc<CommandProperties> {
        &self.properties
    }

    pub fn metrics(&self) -> &Arc<CommandMetrics<C>> {
        &self.metrics
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    pub fn semaphore(&self) -> &CommandSemaphore {
        &self.semaphore
    }

    pub fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    pub fn snapshot(&self) -> CommandSnapshot {
        CommandSnapshot::capture(self)
    }
}

/// String-keyed store of command handles.
pub struct CommandRegistry<C: Clock = SystemClock> {
    clock: Arc<C>,
    commands: DashMap<String, Arc<CommandHandle<C>>>,
}

impl<C: Clock> std::fmt::Debug for CommandRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry").field("keys", &self.keys()).finish()
    }
}

impl CommandRegistry<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for CommandRegistry<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> CommandRegistry<C> {
    /// Create a registry whose windows and breakers read time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { clock: Arc::new(clock), commands: DashMap::new() }
    }

    /// Register `key` under `group`. The first declaration of a key wins;
    /// later declarations return the existing handle and ignore their
    /// arguments.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for an empty key or, on the first
    /// declaration, a config that fails validation.
    pub fn declare(
        &self,
        key: impl Into<String>,
        group: impl Into<String>,
        config: CommandConfig,
    ) -> ConfigResult<Arc<CommandHandle<C>>> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::invalid("command key must not be empty"));
        }

        if let Some(existing) = self.commands.get(&key) {
            debug!(command = %key, "Command already declared, keeping first declaration");
            return Ok(Arc::clone(existing.value()));
        }

        config.validate()?;
        let group = group.into();
        let handle = self
            .commands
            .entry(key.clone())
            .or_insert_with(|| {
                info!(command = %key, group = %group, "Declared command");
                Arc::new(CommandHandle::new(key.clone(), group, &config, Arc::clone(&self.clock)))
            })
            .value()
            .clone();
        Ok(handle)
    }

    /// Declare every command in a loaded configuration document.
    pub fn declare_all(&self, file: &CommandsFile) -> ConfigResult<Vec<Arc<CommandHandle<C>>>> {
        file.commands
            .iter()
            .map(|(key, declaration)| {
                self.declare(key.clone(), declaration.group.clone(), declaration.config.clone())
            })
            .collect()
    }

    pub fn handle(&self, key: &str) -> Option<Arc<CommandHandle<C>>> {
        self.commands.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Handle for `key`, declaring it with default settings and
    /// `group = key` if unseen.
    pub fn handle_or_default(&self, key: &str) -> Arc<CommandHandle<C>> {
        if let Some(existing) = self.handle(key) {
            return existing;
        }

        self.commands
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(command = %key, "Declaring command with default configuration");
                Arc::new(CommandHandle::new(
                    key,
                    key,
                    &CommandConfig::default(),
                    Arc::clone(&self.clock),
                ))
            })
            .value()
            .clone()
    }

    /// Apply new live values to an existing command.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the key is unknown or the config
    /// fails validation.
    pub fn update_properties(&self, key: &str, config: &CommandConfig) -> ConfigResult<()> {
        config.validate()?;
        let handle = self
            .handle(key)
            .ok_or_else(|| ConfigError::invalid(format!("unknown command '{key}'")))?;
        handle.properties().update(config);
        info!(command = %key, "Updated command properties");
        Ok(())
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.commands.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forget every command. Handles already held elsewhere keep working but
    /// are no longer reachable from this registry.
    pub fn reset(&self) {
        self.commands.clear();
        info!("Command registry reset");
    }

    /// Run `command` under the key's breaker, bulkheads and timeout.
    ///
    /// Unknown keys are declared with default settings on first use.
    pub async fn execute<T, E>(&self, key: &str, command: Command<T, E>) -> Result<T, CommandError<E>>
    where
        T: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let handle = self.handle_or_default(key);
        CommandExecutor::new(handle, command).run().await
    }

    /// One metrics snapshot per command, sorted by key.
    pub fn snapshots(&self) -> Vec<CommandSnapshot> {
        let mut handles: Vec<Arc<CommandHandle<C>>> =
            self.commands.iter().map(|e| Arc::clone(e.value())).collect();
        handles.sort_by(|a, b| a.key().cmp(b.key()));
        handles.iter().map(|handle| handle.snapshot()).collect()
    }
}
