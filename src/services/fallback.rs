//! Fallback execution across a provider chain.
//!
//! Tries providers strictly in priority order, consulting each one's circuit
//! breaker before touching it. A provider gets a bounded retry envelope
//! (backoff between attempts, escalating timeouts); the first success wins
//! and nothing further is tried. If the whole chain is skipped or exhausted,
//! the per-provider errors are aggregated into one terminal failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::domain::errors::{AllProvidersFailed, AttemptOutcome, ProviderError, ProviderFailure};
use crate::domain::ports::Clock;
use crate::services::provider_registry::{ProviderEntry, ProviderRegistry};
use crate::services::retry_schedule::RetrySchedule;

/// A successful fallback execution: the value plus which provider produced
/// it.
#[derive(Debug, Clone)]
pub struct Executed<T> {
    pub value: T,
    pub provider: String,
}

/// Runs one operation against a provider chain with breaker gating and
/// per-provider retries.
pub struct FallbackExecutor<P: ?Sized> {
    registry: Arc<ProviderRegistry<P>>,
    schedule: RetrySchedule,
    clock: Arc<dyn Clock>,
}

impl<P: ?Sized> FallbackExecutor<P> {
    pub fn new(
        registry: Arc<ProviderRegistry<P>>,
        schedule: RetrySchedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            schedule,
            clock,
        }
    }

    /// Shared registry handle, for health/breaker observability.
    pub fn registry(&self) -> &Arc<ProviderRegistry<P>> {
        &self.registry
    }

    /// Execute `call` against providers in priority order.
    ///
    /// Providers whose breaker refuses are skipped without an attempt and
    /// their circuit state is left untouched. At most one provider wins; on
    /// success its breaker and health stats are updated and remaining
    /// providers are never touched.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        mut call: F,
    ) -> Result<Executed<T>, AllProvidersFailed>
    where
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut failures = Vec::new();

        for entry in self.registry.entries() {
            let name = entry.descriptor.name.clone();

            if !entry.breaker.should_attempt() {
                debug!(operation, provider = %name, "skipping provider, circuit open");
                failures.push(ProviderFailure {
                    provider: name,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            }

            match self.try_provider(operation, entry, &mut call).await {
                Ok(value) => {
                    entry.breaker.record_success();
                    debug!(operation, provider = %name, "operation succeeded");
                    return Ok(Executed {
                        value,
                        provider: name,
                    });
                }
                Err(err) => {
                    entry.breaker.record_failure(&err);
                    warn!(operation, provider = %name, error = %err, "provider exhausted, falling back");
                    failures.push(ProviderFailure {
                        provider: name,
                        outcome: AttemptOutcome::Failed(err),
                    });
                }
            }
        }

        Err(AllProvidersFailed {
            operation: operation.to_string(),
            failures,
        })
    }

    /// Retry envelope for one provider: initial attempt plus up to
    /// `max_retries` retries, sleeping between attempts. Permanent errors
    /// abort immediately.
    async fn try_provider<T, F, Fut>(
        &self,
        operation: &str,
        entry: &Arc<ProviderEntry<P>>,
        call: &mut F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0_u32;

        loop {
            let timeouts = self.schedule.timeouts_for(attempt);
            let started = Instant::now();

            let result = tokio::time::timeout(timeouts.total(), call(entry.provider.clone()))
                .await
                .unwrap_or_else(|_| {
                    Err(ProviderError::Transport(format!(
                        "attempt timed out after {:?}",
                        timeouts.total()
                    )))
                });

            match result {
                Ok(value) => {
                    #[allow(clippy::cast_precision_loss)]
                    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                    entry.record_success(elapsed_ms);
                    return Ok(value);
                }
                Err(err) => {
                    entry.record_failure();

                    if !err.is_retryable() || attempt >= self.schedule.max_retries {
                        return Err(err);
                    }

                    let delay = match &err {
                        ProviderError::RateLimited { retry_after } => {
                            self.schedule.rate_limit_delay(*retry_after)
                        }
                        _ => self.schedule.backoff_delay(attempt),
                    };

                    debug!(
                        operation,
                        provider = %entry.descriptor.name,
                        attempt,
                        delay = ?delay,
                        error = %err,
                        "transient failure, retrying same provider"
                    );
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ProviderDescriptor, RetrySettings};
    use crate::services::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::services::test_support::ManualClock;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider double that replays a scripted response sequence.
    struct Scripted {
        name: &'static str,
        responses: Mutex<VecDeque<Result<u32, ProviderError>>>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Scripted {
        fn next(&self) -> Result<u32, ProviderError> {
            self.calls.lock().unwrap().push(self.name);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::Transport("script exhausted".into())))
        }
    }

    struct Harness {
        executor: FallbackExecutor<Scripted>,
        clock: Arc<ManualClock>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    fn harness(
        scripts: Vec<(&'static str, Vec<Result<u32, ProviderError>>)>,
        breaker_config: CircuitBreakerConfig,
        retry: RetrySettings,
    ) -> Harness {
        let clock = Arc::new(ManualClock::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProviderRegistry::new(breaker_config, clock.clone());

        for (index, (name, responses)) in scripts.into_iter().enumerate() {
            registry.register(
                ProviderDescriptor::new(name, u32::try_from(index).unwrap() + 1),
                Arc::new(Scripted {
                    name,
                    responses: Mutex::new(responses.into()),
                    calls: calls.clone(),
                }),
            );
        }

        Harness {
            executor: FallbackExecutor::new(
                Arc::new(registry),
                RetrySchedule::from(&retry),
                clock.clone(),
            ),
            clock,
            calls,
        }
    }

    fn fast_retry() -> RetrySettings {
        RetrySettings {
            max_retries: 1,
            base_delay_ms: 10,
            max_delay_ms: 100,
            jitter_factor: 0.0,
            min_delay_ms: 1,
            ..RetrySettings::default()
        }
    }

    fn transport() -> ProviderError {
        ProviderError::Transport("boom".into())
    }

    #[tokio::test]
    async fn first_healthy_provider_wins_and_rest_are_untouched() {
        let h = harness(
            vec![
                ("primary", vec![Ok(1)]),
                ("backup", vec![Ok(2)]),
            ],
            CircuitBreakerConfig::default(),
            fast_retry(),
        );

        let executed = h
            .executor
            .execute("generate", |p| async move { p.next() })
            .await
            .unwrap();

        assert_eq!(executed.value, 1);
        assert_eq!(executed.provider, "primary");
        assert_eq!(*h.calls.lock().unwrap(), vec!["primary"]);
    }

    #[tokio::test]
    async fn open_breaker_is_skipped_without_counting_an_attempt() {
        // Scenario: P1 open, P2 closed; execute must succeed via P2 and leave
        // P1's failure count alone.
        let h = harness(
            vec![
                ("p1", vec![Ok(1)]),
                ("p2", vec![Ok(2)]),
            ],
            CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::from_secs(600),
                ..Default::default()
            },
            fast_retry(),
        );

        let p1 = &h.executor.registry().entries()[0];
        p1.breaker.record_failure(&transport());
        assert_eq!(p1.breaker.state(), CircuitState::Open);
        let failures_before = p1.breaker.failure_count();

        let executed = h
            .executor
            .execute("generate", |p| async move { p.next() })
            .await
            .unwrap();

        assert_eq!(executed.provider, "p2");
        assert_eq!(*h.calls.lock().unwrap(), vec!["p2"]);
        assert_eq!(p1.breaker.failure_count(), failures_before);
        assert_eq!(p1.stats().total_requests, 0);
    }

    #[tokio::test]
    async fn transient_failures_retry_same_provider_before_falling_back() {
        let h = harness(
            vec![
                ("flaky", vec![Err(transport()), Ok(7)]),
                ("backup", vec![Ok(2)]),
            ],
            CircuitBreakerConfig::default(),
            fast_retry(),
        );

        let executed = h
            .executor
            .execute("generate", |p| async move { p.next() })
            .await
            .unwrap();

        assert_eq!(executed.value, 7);
        assert_eq!(executed.provider, "flaky");
        assert_eq!(*h.calls.lock().unwrap(), vec!["flaky", "flaky"]);
        // One backoff sleep happened between the two attempts.
        assert_eq!(h.clock.recorded_sleeps().len(), 1);
    }

    #[tokio::test]
    async fn permanent_error_aborts_provider_without_retry() {
        let h = harness(
            vec![
                ("strict", vec![Err(ProviderError::Provider("rejected".into()))]),
                ("backup", vec![Ok(2)]),
            ],
            CircuitBreakerConfig::default(),
            fast_retry(),
        );

        let executed = h
            .executor
            .execute("generate", |p| async move { p.next() })
            .await
            .unwrap();

        assert_eq!(executed.provider, "backup");
        assert_eq!(*h.calls.lock().unwrap(), vec!["strict", "backup"]);
    }

    #[tokio::test]
    async fn rate_limit_hint_drives_the_retry_delay() {
        let h = harness(
            vec![(
                "limited",
                vec![
                    Err(ProviderError::RateLimited {
                        retry_after: Some(Duration::from_secs(9)),
                    }),
                    Ok(3),
                ],
            )],
            CircuitBreakerConfig::default(),
            fast_retry(),
        );

        let executed = h
            .executor
            .execute("generate", |p| async move { p.next() })
            .await
            .unwrap();

        assert_eq!(executed.value, 3);
        assert_eq!(h.clock.recorded_sleeps(), vec![Duration::from_secs(9)]);
    }

    #[tokio::test]
    async fn exhausting_every_provider_aggregates_errors() {
        let h = harness(
            vec![
                ("p1", vec![Err(transport()), Err(transport())]),
                ("p2", vec![Err(ProviderError::Provider("no".into()))]),
            ],
            CircuitBreakerConfig::default(),
            fast_retry(),
        );

        let err = h
            .executor
            .execute("score", |p| async move { p.next() })
            .await
            .unwrap_err();

        assert_eq!(err.operation, "score");
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.attempted_providers(), vec!["p1", "p2"]);
        // p1: initial + 1 retry, p2: permanent error, single call.
        assert_eq!(*h.calls.lock().unwrap(), vec!["p1", "p1", "p2"]);
    }

    #[tokio::test]
    async fn exhaustion_records_one_breaker_failure_per_provider() {
        let h = harness(
            vec![("p1", vec![Err(transport()), Err(transport())])],
            CircuitBreakerConfig {
                failure_threshold: 2,
                ..Default::default()
            },
            fast_retry(),
        );

        let entry = &h.executor.registry().entries()[0];

        let _ = h
            .executor
            .execute("generate", |p| async move { p.next() })
            .await;
        assert_eq!(entry.breaker.failure_count(), 1);
        assert_eq!(entry.breaker.state(), CircuitState::Closed);

        let _ = h
            .executor
            .execute("generate", |p| async move { p.next() })
            .await;
        assert_eq!(entry.breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn success_updates_health_stats() {
        let h = harness(
            vec![("primary", vec![Ok(5)])],
            CircuitBreakerConfig::default(),
            fast_retry(),
        );

        h.executor
            .execute("generate", |p| async move { p.next() })
            .await
            .unwrap();

        let stats = h.executor.registry().entries()[0].stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.success_count, 1);
    }

    #[tokio::test]
    async fn empty_registry_fails_with_empty_failure_list() {
        let h = harness(vec![], CircuitBreakerConfig::default(), fast_retry());

        let err = h
            .executor
            .execute("generate", |p: Arc<Scripted>| async move { p.next() })
            .await
            .unwrap_err();

        assert!(err.failures.is_empty());
    }
}
