//! One-shot guarded execution of a command.
//!
//! A [`Command`] bundles the operation with its optional fallback and error
//! policies. A [`CommandExecutor`] runs it exactly once against a
//! [`CommandHandle`]:
//!
//! 1. ask the breaker for admission, short-circuiting when open
//! 2. take an execution permit, rejecting when the bulkhead is full
//! 3. race the operation against the execution timeout
//! 4. on any service failure, run the fallback under its own bulkhead
//!
//! Bad requests skip the fallback and come back unchanged. Every path
//! updates the command's metrics and the executor's [`ExecutionRecord`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bulwark_core::command::{Command, CommandExecutor, CommandRegistry};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("lookup failed")]
//! struct LookupError;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = CommandRegistry::new();
//! let handle = registry.handle_or_default("inventory");
//!
//! let command = Command::new(|| async { Err::<u32, _>(LookupError) })
//!     .fallback(|_ctx| async { Ok(0) });
//! let executor = CommandExecutor::new(Arc::clone(&handle), command);
//!
//! assert_eq!(executor.run().await.ok(), Some(0));
//! assert!(executor.is_complete());
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bulwark_common::time::{Clock, SystemClock};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, info_span, warn, Instrument};

use super::circuit_breaker::Admission;
use super::error::{CommandError, FailureType};
use super::event::EventType;
use super::registry::CommandHandle;

type RunFn<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;
type FallbackFn<T, E> = Box<dyn FnOnce(FallbackContext) -> BoxFuture<'static, Result<T, E>> + Send>;
type ErrorPredicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Why a fallback is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackContext {
    pub command: String,
    pub failure_type: FailureType,
}

/// An operation plus its fallback and error policies.
pub struct Command<T, E> {
    run: RunFn<T, E>,
    fallback: Option<FallbackFn<T, E>>,
    bad_request: Option<ErrorPredicate<E>>,
    unrecoverable: Option<ErrorPredicate<E>>,
}

impl<T, E> std::fmt::Debug for Command<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("has_fallback", &self.fallback.is_some())
            .field("has_bad_request_policy", &self.bad_request.is_some())
            .field("has_unrecoverable_policy", &self.unrecoverable.is_some())
            .finish()
    }
}

impl<T, E> Command<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self { run: Box::new(move || run().boxed()), fallback: None, bad_request: None, unrecoverable: None }
    }

    /// Value to return when the operation fails, times out or is rejected.
    pub fn fallback<F, Fut>(mut self, fallback: F) -> Self
    where
        F: FnOnce(FallbackContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.fallback = Some(Box::new(move |context| fallback(context).boxed()));
        self
    }

    /// Errors matching `predicate` are caller faults: they skip the fallback,
    /// leave the breaker alone and reach the caller unchanged.
    pub fn bad_request_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.bad_request = Some(Box::new(predicate));
        self
    }

    /// Errors matching `predicate` are surfaced without attempting the
    /// fallback.
    pub fn unrecoverable_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.unrecoverable = Some(Box::new(predicate));
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// What happened during one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRecord {
    /// Events in the order they were recorded
    pub events: Vec<EventType>,
    pub started_at: Option<Instant>,
    pub completed_at: Option<Instant>,
    /// Why the operation's own result was not returned, if it was not
    pub failure_type: Option<FailureType>,
}

impl ExecutionRecord {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn duration(&self) -> Option<Duration> {
        Some(self.completed_at?.saturating_duration_since(self.started_at?))
    }
}

enum Outcome<T, E> {
    Completed(Result<T, E>),
    TimedOut,
    /// The spawned operation panicked
    Aborted,
}

/// Runs one [`Command`] exactly once.
pub struct CommandExecutor<T, E, C: Clock = SystemClock> {
    handle: Arc<CommandHandle<C>>,
    command: Mutex<Option<Command<T, E>>>,
    record: Mutex<ExecutionRecord>,
}

impl<T, E, C: Clock> std::fmt::Debug for CommandExecutor<T, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("command", &self.handle.key())
            .field("record", &*self.record.lock())
            .finish()
    }
}

impl<T, E, C> CommandExecutor<T, E, C>
where
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    C: Clock,
{
    pub fn new(handle: Arc<CommandHandle<C>>, command: Command<T, E>) -> Self {
        Self {
            handle,
            command: Mutex::new(Some(command)),
            record: Mutex::new(ExecutionRecord::default()),
        }
    }

    pub fn handle(&self) -> &Arc<CommandHandle<C>> {
        &self.handle
    }

    /// Copy of the execution record so far.
    pub fn record(&self) -> ExecutionRecord {
        self.record.lock().clone()
    }

    pub fn is_complete(&self) -> bool {
        self.record.lock().is_complete()
    }

    /// Run the command. A second call fails with
    /// [`CommandError::AlreadyExecuted`] without touching the operation.
    pub async fn run(&self) -> Result<T, CommandError<E>> {
        let command = self.command.lock().take();
        let Some(command) = command else {
            warn!(command = %self.handle.key(), "Executor reused after running");
            return Err(CommandError::AlreadyExecuted { command: self.handle.key().to_string() });
        };

        let span = info_span!("command", command = %self.handle.key(), group = %self.handle.group());
        self.execute(command).instrument(span).await
    }

    async fn execute(&self, command: Command<T, E>) -> Result<T, CommandError<E>> {
        let Command { run, fallback, bad_request, unrecoverable } = command;
        let handle = &*self.handle;
        let unrecoverable = unrecoverable.as_ref();
        let mut finish = Finish::begin(self);

        let admission = handle.breaker().admit();
        if admission == Admission::Rejected {
            self.mark(EventType::ShortCircuited);
            finish.record_latency = false;
            return self.fallback_or_fail(FailureType::ShortCircuit, None, fallback, unrecoverable).await;
        }
        finish.probe = admission == Admission::Probe;

        let Some(permit) = handle.semaphore().try_acquire_execution() else {
            self.mark(EventType::SemaphoreRejected);
            return self
                .fallback_or_fail(FailureType::RejectedSemaphoreExecution, None, fallback, unrecoverable)
                .await;
        };
        let outcome = self.run_with_timeout(run).await;
        drop(permit);

        match outcome {
            Outcome::Completed(Ok(value)) => {
                self.mark(EventType::Success);
                handle.breaker().mark_success();
                finish.succeeded = true;
                Ok(value)
            }
            Outcome::Completed(Err(err)) if bad_request.as_ref().is_some_and(|p| p(&err)) => {
                self.mark(EventType::BadRequest);
                finish.bad_request = true;
                self.record.lock().failure_type = Some(FailureType::BadRequest);
                warn!(failure_type = %FailureType::BadRequest, error = %err, "Command rejected a bad request");
                Err(CommandError::BadRequest { command: handle.key().to_string(), source: err })
            }
            Outcome::Completed(Err(err)) => {
                self.mark(EventType::Failure);
                debug!(error = %err, "Command failed");
                self.fallback_or_fail(FailureType::CommandException, Some(err), fallback, unrecoverable)
                    .await
            }
            Outcome::Aborted => {
                self.mark(EventType::Failure);
                self.fallback_or_fail(FailureType::CommandException, None, fallback, unrecoverable).await
            }
            Outcome::TimedOut => {
                self.mark(EventType::Timeout);
                self.fallback_or_fail(FailureType::Timeout, None, fallback, unrecoverable).await
            }
        }
    }

    /// Race the operation against the execution timeout. With interruption
    /// on, the losing operation is dropped; with it off, the operation runs
    /// as a task that is detached on timeout and whose result is discarded.
    async fn run_with_timeout(&self, run: RunFn<T, E>) -> Outcome<T, E> {
        let properties = self.handle.properties();
        let timeout = properties.execution_timeout();

        if properties.execution_timeout_interrupt() {
            let operation = run();
            if timeout.is_zero() {
                return Outcome::Completed(operation.await);
            }
            return tokio::select! {
                biased;
                result = operation => Outcome::Completed(result),
                () = tokio::time::sleep(timeout) => {
                    debug!(timeout_ms = timeout.as_millis() as u64, "Command timed out, cancelling operation");
                    Outcome::TimedOut
                }
            };
        }

        let mut task = tokio::spawn(run().in_current_span());
        if timeout.is_zero() {
            return joined(task.await);
        }
        tokio::select! {
            biased;
            result = &mut task => joined(result),
            () = tokio::time::sleep(timeout) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "Command timed out, detaching operation");
                Outcome::TimedOut
            }
        }
    }

    async fn fallback_or_fail(
        &self,
        failure_type: FailureType,
        cause: Option<E>,
        fallback: Option<FallbackFn<T, E>>,
        unrecoverable: Option<&ErrorPredicate<E>>,
    ) -> Result<T, CommandError<E>> {
        self.record.lock().failure_type = Some(failure_type);
        let reason = failure_type.describe();

        if let (Some(is_unrecoverable), Some(err)) = (unrecoverable, cause.as_ref()) {
            if is_unrecoverable(err) {
                self.mark(EventType::ExceptionThrown);
                return Err(self.fail(
                    failure_type,
                    format!("{reason} with an unrecoverable error; fallback not attempted"),
                    cause,
                    None,
                ));
            }
        }

        let Some(fallback) = fallback else {
            return Err(self.fail(failure_type, format!("{reason} and no fallback provided"), cause, None));
        };

        let Some(_permit) = self.handle.semaphore().try_acquire_fallback() else {
            self.mark(EventType::FallbackRejection);
            self.record.lock().failure_type = Some(FailureType::RejectedSemaphoreFallback);
            return Err(self.fail(
                FailureType::RejectedSemaphoreFallback,
                format!("{reason} and fallback execution was rejected"),
                cause,
                None,
            ));
        };

        let context = FallbackContext { command: self.handle.key().to_string(), failure_type };
        let span = info_span!("fallback", failure_type = %failure_type);
        match fallback(context).instrument(span).await {
            Ok(value) => {
                self.mark(EventType::FallbackSuccess);
                debug!(failure_type = %failure_type, "Fallback succeeded");
                Ok(value)
            }
            Err(fallback_error) => {
                self.mark(EventType::FallbackFailure);
                Err(self.fail(failure_type, format!("{reason} and fallback failed"), cause, Some(fallback_error)))
            }
        }
    }

    fn fail(
        &self,
        failure_type: FailureType,
        message: String,
        cause: Option<E>,
        fallback_error: Option<E>,
    ) -> CommandError<E> {
        error!(
            failure_type = %failure_type,
            cause = ?cause.as_ref().map(ToString::to_string),
            fallback_error = ?fallback_error.as_ref().map(ToString::to_string),
            "Command {}",
            message
        );
        CommandError::Resilience {
            failure_type,
            command: self.handle.key().to_string(),
            message,
            cause,
            fallback_error,
        }
    }

    fn mark(&self, event: EventType) {
        self.handle.metrics().mark(event);
        self.record.lock().events.push(event);
    }
}

fn joined<T, E>(result: Result<Result<T, E>, tokio::task::JoinError>) -> Outcome<T, E> {
    match result {
        Ok(result) => Outcome::Completed(result),
        Err(join_error) => {
            error!(error = %join_error, "Command task did not complete");
            Outcome::Aborted
        }
    }
}

/// Bookkeeping that runs however the invocation ends, including when the
/// `run` future itself is dropped.
struct Finish<'a, T, E, C: Clock> {
    executor: &'a CommandExecutor<T, E, C>,
    started: Instant,
    record_latency: bool,
    probe: bool,
    succeeded: bool,
    /// Bad requests say nothing about the dependency's health
    bad_request: bool,
}

impl<'a, T, E, C: Clock> Finish<'a, T, E, C> {
    fn begin(executor: &'a CommandExecutor<T, E, C>) -> Self {
        let started = executor.handle.clock().now();
        executor.handle.metrics().increment_execution_count();
        executor.record.lock().started_at = Some(started);
        Self {
            executor,
            started,
            record_latency: true,
            probe: false,
            succeeded: false,
            bad_request: false,
        }
    }
}

impl<T, E, C: Clock> Drop for Finish<'_, T, E, C> {
    fn drop(&mut self) {
        let handle = &self.executor.handle;
        let now = handle.clock().now();
        let elapsed = now.saturating_duration_since(self.started);

        if self.record_latency {
            handle.metrics().add_execution_time(elapsed);
        }
        if self.probe && self.bad_request {
            handle.breaker().release_probe();
        } else if self.probe && !self.succeeded {
            handle.breaker().mark_probe_failure();
        }
        handle.metrics().decrement_execution_count();
        self.executor.record.lock().completed_at = Some(now);
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Command complete");
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the executor paths. Timing-sensitive scenarios live in
    //! the integration suite.

    use bulwark_common::MockClock;
    use thiserror::Error;

    use super::*;
    use crate::command::circuit_breaker::CircuitState;
    use crate::config::CommandConfig;

    #[derive(Debug, Error, PartialEq)]
    enum TestError {
        #[error("service unavailable")]
        Unavailable,
        #[error("invalid input")]
        Invalid,
        #[error("fatal")]
        Fatal,
        #[error("fallback broke")]
        FallbackBroke,
    }

    fn handle_with(config: CommandConfig) -> (MockClock, Arc<CommandHandle<MockClock>>) {
        let clock = MockClock::new();
        let handle = Arc::new(CommandHandle::new("test", "group", &config, Arc::new(clock.clone())));
        (clock, handle)
    }

    fn handle() -> (MockClock, Arc<CommandHandle<MockClock>>) {
        handle_with(CommandConfig::default())
    }

    fn failing() -> Command<u32, TestError> {
        Command::new(|| async { Err(TestError::Unavailable) })
    }

    #[tokio::test]
    async fn test_success_path() {
        let (_clock, handle) = handle();
        let executor = CommandExecutor::new(Arc::clone(&handle), Command::new(|| async { Ok::<_, TestError>(7) }));

        assert_eq!(executor.run().await.expect("Should succeed"), 7);

        let record = executor.record();
        assert_eq!(record.events, vec![EventType::Success]);
        assert_eq!(record.failure_type, None);
        assert!(record.is_complete());
        assert_eq!(handle.metrics().current_execution_count(), 0);
        assert_eq!(handle.semaphore().execution_count(), 0);
    }

    /// Validates a second run fails without invoking the operation again.
    #[tokio::test]
    async fn test_run_is_one_shot() {
        let (_clock, handle) = handle();
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let executor = CommandExecutor::new(
            Arc::clone(&handle),
            Command::new(move || async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, TestError>(())
            }),
        );

        executor.run().await.expect("First run should succeed");
        let second = executor.run().await;

        assert!(matches!(second, Err(CommandError::AlreadyExecuted { .. })));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(handle.metrics().cumulative_count(EventType::Success), 1);
    }

    #[tokio::test]
    async fn test_failure_without_fallback() {
        let (_clock, handle) = handle();
        let executor = CommandExecutor::new(Arc::clone(&handle), failing());

        let err = executor.run().await.expect_err("Should fail");

        assert_eq!(err.failure_type(), Some(FailureType::CommandException));
        assert_eq!(err.cause(), Some(&TestError::Unavailable));
        assert!(err.to_string().contains("no fallback provided"));
        assert_eq!(executor.record().events, vec![EventType::Failure]);
    }

    #[tokio::test]
    async fn test_fallback_success_receives_context() {
        let (_clock, handle) = handle();
        let command = failing().fallback(|ctx| async move {
            assert_eq!(ctx.command, "test");
            assert_eq!(ctx.failure_type, FailureType::CommandException);
            Ok(42)
        });
        let executor = CommandExecutor::new(Arc::clone(&handle), command);

        assert_eq!(executor.run().await.expect("Fallback should answer"), 42);

        let record = executor.record();
        assert_eq!(record.events, vec![EventType::Failure, EventType::FallbackSuccess]);
        assert_eq!(record.failure_type, Some(FailureType::CommandException));
    }

    #[tokio::test]
    async fn test_fallback_failure_carries_both_errors() {
        let (_clock, handle) = handle();
        let command = failing().fallback(|_| async { Err(TestError::FallbackBroke) });
        let executor = CommandExecutor::new(Arc::clone(&handle), command);

        let err = executor.run().await.expect_err("Should fail");

        assert_eq!(err.failure_type(), Some(FailureType::CommandException));
        assert_eq!(err.cause(), Some(&TestError::Unavailable));
        assert_eq!(err.fallback_error(), Some(&TestError::FallbackBroke));
        assert_eq!(handle.metrics().rolling_count(EventType::FallbackFailure), 1);
        assert_eq!(handle.semaphore().fallback_count(), 0);
    }

    /// Validates bad requests skip the fallback and do not count as errors.
    #[tokio::test]
    async fn test_bad_request_is_rethrown() {
        let (_clock, handle) = handle();
        let command = Command::new(|| async { Err::<u32, _>(TestError::Invalid) })
            .bad_request_when(|e| *e == TestError::Invalid)
            .fallback(|_| async { Ok(0) });
        let executor = CommandExecutor::new(Arc::clone(&handle), command);

        let err = executor.run().await.expect_err("Should surface bad request");

        assert!(err.is_bad_request());
        assert_eq!(err.into_source(), Some(TestError::Invalid));
        assert_eq!(executor.record().events, vec![EventType::BadRequest]);
        assert_eq!(handle.metrics().health_counts().total_count, 0);
    }

    #[tokio::test]
    async fn test_unrecoverable_error_skips_fallback() {
        let (_clock, handle) = handle();
        let command = Command::new(|| async { Err::<u32, _>(TestError::Fatal) })
            .unrecoverable_when(|e| *e == TestError::Fatal)
            .fallback(|_| async { Ok(0) });
        let executor = CommandExecutor::new(Arc::clone(&handle), command);

        let err = executor.run().await.expect_err("Should not fall back");

        assert_eq!(err.failure_type(), Some(FailureType::CommandException));
        assert_eq!(executor.record().events, vec![EventType::Failure, EventType::ExceptionThrown]);
        assert_eq!(handle.metrics().rolling_count(EventType::FallbackSuccess), 0);
    }

    /// Validates short-circuits run the fallback and skip latency recording.
    #[tokio::test]
    async fn test_short_circuit_uses_fallback() {
        let config = CommandConfig::builder().force_open(true).build().expect("Should build");
        let (clock, handle) = handle_with(config);
        let command = Command::new(|| async { Ok::<u32, TestError>(1) }).fallback(|ctx| async move {
            assert_eq!(ctx.failure_type, FailureType::ShortCircuit);
            Ok(2)
        });
        let executor = CommandExecutor::new(Arc::clone(&handle), command);

        assert_eq!(executor.run().await.expect("Fallback should answer"), 2);
        assert_eq!(executor.record().events, vec![EventType::ShortCircuited, EventType::FallbackSuccess]);

        clock.advance_millis(10_000);
        assert!(handle.metrics().execution_time_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_semaphore_rejection() {
        let config = CommandConfig::builder().execution_max_concurrent_requests(0).build().expect("Should build");
        let (_clock, handle) = handle_with(config);
        let executor = CommandExecutor::new(Arc::clone(&handle), Command::new(|| async { Ok::<u32, TestError>(1) }));

        let err = executor.run().await.expect_err("Should be rejected");

        assert_eq!(err.failure_type(), Some(FailureType::RejectedSemaphoreExecution));
        assert_eq!(handle.metrics().health_counts().error_count, 1);
    }

    #[tokio::test]
    async fn test_fallback_rejection() {
        let config = CommandConfig::builder().fallback_max_concurrent_requests(0).build().expect("Should build");
        let (_clock, handle) = handle_with(config);
        let executor = CommandExecutor::new(Arc::clone(&handle), failing().fallback(|_| async { Ok(0) }));

        let err = executor.run().await.expect_err("Fallback should be rejected");

        assert_eq!(err.failure_type(), Some(FailureType::RejectedSemaphoreFallback));
        assert_eq!(err.cause(), Some(&TestError::Unavailable));
        assert_eq!(executor.record().events, vec![EventType::Failure, EventType::FallbackRejection]);
    }

    /// Validates a failed probe keeps the breaker open with a fresh sleep
    /// window and a successful probe closes it.
    #[tokio::test]
    async fn test_probe_outcomes_drive_breaker() {
        let config = CommandConfig::builder()
            .request_volume_threshold(2)
            .error_threshold_percentage(50)
            .sleep_window(Duration::from_millis(5_000))
            .build()
            .expect("Should build");
        let (clock, handle) = handle_with(config);
        for _ in 0..2 {
            let _ = CommandExecutor::new(Arc::clone(&handle), failing()).run().await;
        }
        assert_eq!(handle.breaker().state(), CircuitState::Open);

        clock.advance_millis(5_000);
        let _ = CommandExecutor::new(Arc::clone(&handle), failing()).run().await;
        assert!(!handle.breaker().allow_request(), "failed probe restarts the sleep window");

        clock.advance_millis(5_000);
        let ok = CommandExecutor::new(Arc::clone(&handle), Command::new(|| async { Ok::<u32, TestError>(1) }))
            .run()
            .await;
        assert_eq!(ok.expect("Probe should succeed"), 1);
        assert_eq!(handle.breaker().state(), CircuitState::Closed);
    }

    /// Validates a bad request admitted as the trial request leaves the
    /// breaker's sleep window where it was.
    #[tokio::test]
    async fn test_bad_request_probe_keeps_sleep_window() {
        let config = CommandConfig::builder()
            .request_volume_threshold(2)
            .error_threshold_percentage(50)
            .sleep_window(Duration::from_millis(5_000))
            .build()
            .expect("Should build");
        let (clock, handle) = handle_with(config);
        for _ in 0..3 {
            let _ = CommandExecutor::new(Arc::clone(&handle), failing()).run().await;
        }
        assert!(!handle.breaker().allow_request(), "failed trial starts the sleep window");

        clock.advance_millis(5_000);
        let command = Command::new(|| async { Err::<u32, _>(TestError::Invalid) })
            .bad_request_when(|e| *e == TestError::Invalid);
        let err = CommandExecutor::new(Arc::clone(&handle), command)
            .run()
            .await
            .expect_err("Should surface bad request");
        assert!(err.is_bad_request());

        clock.advance_millis(1);
        assert!(handle.breaker().allow_request(), "sleep window must not restart");
    }

    #[tokio::test]
    async fn test_spawned_operation_panic_is_a_failure() {
        let config = CommandConfig::builder().execution_timeout_interrupt(false).build().expect("Should build");
        let (_clock, handle) = handle_with(config);
        let command: Command<u32, TestError> = Command::new(|| async { panic!("operation blew up") });
        let executor = CommandExecutor::new(Arc::clone(&handle), command);

        let err = executor.run().await.expect_err("Should report failure");

        assert_eq!(err.failure_type(), Some(FailureType::CommandException));
        assert!(err.cause().is_none());
        assert_eq!(handle.metrics().rolling_count(EventType::Failure), 1);
    }

    #[tokio::test]
    async fn test_execution_time_recorded_from_clock() {
        let (clock, handle) = handle();
        let timer = clock.clone();
        let command = Command::new(move || async move {
            timer.advance_millis(25);
            Ok::<_, TestError>(())
        });
        CommandExecutor::new(Arc::clone(&handle), command).run().await.expect("Should succeed");

        clock.advance_millis(10_000);
        assert_eq!(handle.metrics().execution_time_percentile(50.0), 25.0);
    }
}
