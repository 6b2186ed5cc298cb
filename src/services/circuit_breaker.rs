//! Circuit breaker pattern for provider failure detection and recovery.
//!
//! One breaker per registered provider gates calls to it: repeated counted
//! failures open the circuit, a recovery timeout moves it to half-open on the
//! next attempt check, and a run of successes closes it again. The open to
//! half-open transition is lazy: it happens inside `should_attempt`, never on
//! a background timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::ProviderError;
use crate::domain::models::BreakerSettings;
use crate::domain::ports::Clock;

/// Configuration for circuit breakers.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Counted failures before opening the circuit.
    pub failure_threshold: u32,
    /// Duration to keep circuit open before probing half-open.
    pub recovery_timeout: Duration,
    /// Successful calls in half-open state required to close the circuit.
    pub success_threshold: u32,
    /// Whether rate-limit failures are counted. Off by policy: a throttled
    /// provider is busy, not broken.
    pub count_rate_limited: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
            count_rate_limited: false,
        }
    }
}

impl From<&BreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &BreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            recovery_timeout: Duration::from_secs(settings.recovery_timeout_secs),
            success_threshold: settings.success_threshold,
            count_rate_limited: false,
        }
    }
}

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are blocked.
    Open,
    /// Testing whether the provider recovered.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Consecutive counted failures; resets on any success.
    failure_count: u32,
    /// Successes while half-open; resets on leaving that state.
    success_count: u32,
    last_failure_at: Option<DateTime<Utc>>,
}

/// Per-provider three-state failure gate.
///
/// All state sits behind a single mutex; the breaker is safe to share across
/// concurrent subject tasks hitting the same provider.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
            }),
        }
    }

    /// Whether a call may be attempted right now.
    ///
    /// While open, returns false until `recovery_timeout` has elapsed since
    /// the last failure; at that point the breaker moves to half-open and the
    /// call is allowed as a probe.
    pub fn should_attempt(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let Some(last_failure) = inner.last_failure_at else {
                    return false;
                };
                let elapsed = self.clock.now() - last_failure;
                if elapsed.to_std().unwrap_or(Duration::ZERO) >= self.config.recovery_timeout {
                    debug!(provider = %self.name, "circuit probing half-open");
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.failure_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                debug!(provider = %self.name, "circuit closed after recovery");
                inner.state = CircuitState::Closed;
                inner.success_count = 0;
                inner.last_failure_at = None;
            }
        }
    }

    /// Record a failed call. Only counted failure kinds move breaker state;
    /// a rate-limit error is ignored here unless configured otherwise.
    pub fn record_failure(&self, error: &ProviderError) {
        if !self.counts(error) {
            return;
        }

        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.last_failure_at = Some(self.clock.now());

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    debug!(provider = %self.name, failures = inner.failure_count, "circuit opened");
                    inner.state = CircuitState::Open;
                }
            }
            // Single strike during probation.
            CircuitState::HalfOpen => {
                debug!(provider = %self.name, "circuit reopened from half-open");
                inner.state = CircuitState::Open;
                inner.success_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Current state, for observability.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    /// Current consecutive counted-failure count.
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().expect("breaker lock poisoned").failure_count
    }

    fn counts(&self, error: &ProviderError) -> bool {
        match error {
            ProviderError::RateLimited { .. } => self.config.count_rate_limited,
            _ => error.trips_breaker(),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
