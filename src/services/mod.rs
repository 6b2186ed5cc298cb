//! Domain services: resilience primitives and the convergence engine.

pub mod circuit_breaker;
pub mod convergence;
pub mod fallback;
pub mod learning;
pub mod provider_registry;
pub mod retry_schedule;

#[cfg(test)]
pub(crate) mod test_support;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use convergence::{ConvergenceError, ConvergenceLoop};
pub use fallback::{Executed, FallbackExecutor};
pub use learning::LearningStore;
pub use provider_registry::{ProviderEntry, ProviderRegistry};
pub use retry_schedule::{AttemptTimeouts, RetrySchedule};
