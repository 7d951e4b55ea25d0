//! Bulkhead permits for command execution and fallback.
//!
//! Two independent counters bound how many executions and how many
//! fallbacks of one command may run at once. Limits are read from the live
//! properties on every acquisition, so lowering a limit takes effect for new
//! callers immediately while permits already held are honored.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::properties::CommandProperties;

#[derive(Debug)]
pub struct CommandSemaphore {
    properties: Arc<CommandProperties>,
    executions: AtomicU32,
    fallbacks: AtomicU32,
}

impl CommandSemaphore {
    pub fn new(properties: Arc<CommandProperties>) -> Self {
        Self { properties, executions: AtomicU32::new(0), fallbacks: AtomicU32::new(0) }
    }

    /// Take an execution permit if one is free. Pair with
    /// [`release_execution_command`](Self::release_execution_command).
    pub fn can_execute_command(&self) -> bool {
        try_increment(&self.executions, self.properties.execution_max_concurrent_requests())
    }

    pub fn release_execution_command(&self) {
        release(&self.executions);
    }

    /// Take a fallback permit if one is free. Pair with
    /// [`release_fallback`](Self::release_fallback).
    pub fn can_execute_fallback(&self) -> bool {
        try_increment(&self.fallbacks, self.properties.fallback_max_concurrent_requests())
    }

    pub fn release_fallback(&self) {
        release(&self.fallbacks);
    }

    /// Execution permit released when the guard drops.
    pub fn try_acquire_execution(&self) -> Option<ExecutionPermit<'_>> {
        self.can_execute_command().then(|| ExecutionPermit { semaphore: self })
    }

    /// Fallback permit released when the guard drops.
    pub fn try_acquire_fallback(&self) -> Option<FallbackPermit<'_>> {
        self.can_execute_fallback().then(|| FallbackPermit { semaphore: self })
    }

    pub fn execution_count(&self) -> u32 {
        self.executions.load(Ordering::Acquire)
    }

    pub fn fallback_count(&self) -> u32 {
        self.fallbacks.load(Ordering::Acquire)
    }
}

fn try_increment(counter: &AtomicU32, limit: u32) -> bool {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| (held < limit).then(|| held + 1))
        .is_ok()
}

fn release(counter: &AtomicU32) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| held.checked_sub(1));
}

/// RAII execution permit
#[must_use = "the permit is released as soon as it is dropped"]
#[derive(Debug)]
pub struct ExecutionPermit<'a> {
    semaphore: &'a CommandSemaphore,
}

impl Drop for ExecutionPermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release_execution_command();
    }
}

/// RAII fallback permit
#[must_use = "the permit is released as soon as it is dropped"]
#[derive(Debug)]
pub struct FallbackPermit<'a> {
    semaphore: &'a CommandSemaphore,
}

impl Drop for FallbackPermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release_fallback();
    }
}
