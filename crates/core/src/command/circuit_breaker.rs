//! Statistics-driven circuit breaker.
//!
//! The breaker has two states. [`is_open`] is computed from the rolling health
//! counts alone, so there is no background timer: the CLOSED to OPEN
//! transition is noticed by the next [`allow_request`]. That first request
//! after the trip runs as the trial request and starts the sleep window.
//! Afterwards a single trial is let through per elapsed sleep window; its
//! outcome either closes the breaker or restarts the sleep window from the
//! moment the trial failed.
//!
//! [`is_open`]: CircuitBreaker::is_open
//! [`allow_request`]: CircuitBreaker::allow_request

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bulwark_common::time::{Clock, SystemClock};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::metrics::CommandMetrics;
use super::properties::CommandProperties;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow; health is evaluated from the rolling window
    Closed,
    /// Requests are short-circuited apart from periodic probes
    Open,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
        }
    }
}

/// Outcome of asking the breaker for permission to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Breaker closed (or forced closed)
    Closed,
    /// The single trial request of an open breaker
    Probe,
    /// Short-circuit
    Rejected,
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Admission::Rejected)
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    /// Set while OPEN; moved forward whenever a probe is admitted or fails.
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    /// `opened_at` as it was before the in-flight probe was admitted
    before_probe: Option<Instant>,
}

/// Circuit breaker bound to one command's metrics and properties.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    key: String,
    properties: Arc<CommandProperties>,
    metrics: Arc<CommandMetrics<C>>,
    clock: Arc<C>,
    state: Mutex<BreakerState>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CircuitBreaker")
            .field("key", &self.key)
            .field("opened_at", &state.opened_at)
            .field("probe_in_flight", &state.probe_in_flight)
            .finish()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(
        key: impl Into<String>,
        properties: Arc<CommandProperties>,
        metrics: Arc<CommandMetrics<C>>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            key: key.into(),
            properties,
            metrics,
            clock,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Whether the health counts breach both thresholds, subject to the
    /// force flags.
    pub fn is_open(&self) -> bool {
        if self.properties.force_open() {
            return true;
        }
        if self.properties.force_closed() {
            return false;
        }
        self.thresholds_breached()
    }

    /// Whether a request may run now.
    pub fn allow_request(&self) -> bool {
        self.admit().is_allowed()
    }

    /// Decide whether a request may run, distinguishing a trial probe from
    /// normal closed-state traffic.
    pub fn admit(&self) -> Admission {
        if self.properties.force_open() {
            return Admission::Rejected;
        }
        if self.properties.force_closed() {
            return Admission::Closed;
        }

        if !self.thresholds_breached() {
            return Admission::Closed;
        }

        let mut state = self.state.lock();
        if state.probe_in_flight {
            return Admission::Rejected;
        }

        let now = self.clock.now();
        match state.opened_at {
            Some(opened_at)
                if now.saturating_duration_since(opened_at) < self.properties.sleep_window() =>
            {
                return Admission::Rejected;
            }
            Some(_) => debug!(command = %self.key, "Circuit breaker admitting trial request"),
            None => {
                let health = self.metrics.health_counts();
                warn!(
                    command = %self.key,
                    total_count = health.total_count,
                    error_percentage = health.error_percentage,
                    "Circuit breaker opened"
                );
            }
        }

        state.before_probe = state.opened_at.replace(now);
        state.probe_in_flight = true;
        Admission::Probe
    }

    /// Report a successful execution. Closes an open breaker and starts its
    /// statistics afresh.
    pub fn mark_success(&self) {
        let mut state = self.state.lock();
        let was_open = state.opened_at.take().is_some();
        state.probe_in_flight = false;
        state.before_probe = None;
        drop(state);

        if was_open {
            self.metrics.reset_counters();
            info!(command = %self.key, "Circuit breaker closed");
        }
    }

    /// Report that an admitted probe did not succeed. The sleep window
    /// restarts from now.
    pub fn mark_probe_failure(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.probe_in_flight = false;
        state.before_probe = None;
        if state.opened_at.is_some() {
            state.opened_at = Some(now);
            debug!(command = %self.key, "Trial request failed, circuit breaker stays open");
        }
    }

    /// Give back an admitted probe whose outcome says nothing about the
    /// dependency, such as a bad request. The sleep window is left as it
    /// was before the probe.
    pub fn release_probe(&self) {
        let mut state = self.state.lock();
        if state.probe_in_flight {
            state.probe_in_flight = false;
            state.opened_at = state.before_probe.take();
        }
    }

    pub fn state(&self) -> CircuitState {
        if self.is_open() {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    /// Return to CLOSED with no probe in flight. Metrics are left alone.
    pub fn reset(&self) {
        *self.state.lock() = BreakerState::default();
    }

    fn thresholds_breached(&self) -> bool {
        let health = self.metrics.health_counts();
        health.total_count >= self.properties.request_volume_threshold()
            && health.error_percentage >= self.properties.error_threshold_percentage()
    }
}
