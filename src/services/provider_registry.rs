//! Ordered provider registry.
//!
//! One registry per provider kind (generation, detection). Each entry pairs
//! a provider handle with its circuit breaker and health stats; the two are
//! process-wide shared state, one instance per provider, safe under
//! concurrent subject tasks.

use std::sync::{Arc, Mutex};

use crate::domain::models::{ProviderDescriptor, ProviderHealthStats};
use crate::domain::ports::Clock;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

/// A registered provider with its gate and counters.
pub struct ProviderEntry<P: ?Sized> {
    pub descriptor: ProviderDescriptor,
    pub provider: Arc<P>,
    pub breaker: CircuitBreaker,
    stats: Mutex<ProviderHealthStats>,
}

impl<P: ?Sized> ProviderEntry<P> {
    /// Fold a successful attempt into the health stats.
    pub fn record_success(&self, response_ms: f64) {
        self.stats
            .lock()
            .expect("stats lock poisoned")
            .record_success(response_ms);
    }

    /// Count a failed attempt.
    pub fn record_failure(&self) {
        self.stats
            .lock()
            .expect("stats lock poisoned")
            .record_failure();
    }

    /// Snapshot of the entry's health counters.
    pub fn stats(&self) -> ProviderHealthStats {
        self.stats.lock().expect("stats lock poisoned").clone()
    }
}

/// Ordered list of providers plus their breakers and health stats.
///
/// Entries are kept sorted by priority; iteration order is the fallback
/// order. Construct one at process start and share it by `Arc` — no ambient
/// singletons, so tests can build isolated registries.
pub struct ProviderRegistry<P: ?Sized> {
    entries: Vec<Arc<ProviderEntry<P>>>,
    breaker_config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl<P: ?Sized> ProviderRegistry<P> {
    pub fn new(breaker_config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Vec::new(),
            breaker_config,
            clock,
        }
    }

    /// Register a provider; entries re-sort by priority on every insert.
    pub fn register(&mut self, descriptor: ProviderDescriptor, provider: Arc<P>) {
        let breaker = CircuitBreaker::new(
            descriptor.name.clone(),
            self.breaker_config.clone(),
            self.clock.clone(),
        );
        self.entries.push(Arc::new(ProviderEntry {
            descriptor,
            provider,
            breaker,
            stats: Mutex::new(ProviderHealthStats::default()),
        }));
        self.entries
            .sort_by_key(|entry| entry.descriptor.priority);
    }

    /// Entries in fallback (priority) order.
    pub fn entries(&self) -> &[Arc<ProviderEntry<P>>] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Breaker state for a provider, if registered.
    pub fn breaker_state(&self, name: &str) -> Option<CircuitState> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.name == name)
            .map(|entry| entry.breaker.state())
    }

    /// Health stats for every provider, in fallback order.
    pub fn stats_snapshot(&self) -> Vec<(String, ProviderHealthStats)> {
        self.entries
            .iter()
            .map(|entry| (entry.descriptor.name.clone(), entry.stats()))
            .collect()
    }
}
