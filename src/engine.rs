//! Composition root: builds the full engine from a `Config`.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::application::Optimizer;
use crate::domain::models::{
    Config, ConvergenceOutcome, ProviderDescriptor, ProviderEndpointConfig, RunConfig, Subject,
};
use crate::domain::ports::{Clock, Detector, Generator, SystemClock};
use crate::infrastructure::history::JsonHistoryStore;
use crate::infrastructure::providers::{HttpDetector, HttpGenerator};
use crate::services::circuit_breaker::CircuitBreakerConfig;
use crate::services::fallback::FallbackExecutor;
use crate::services::provider_registry::ProviderRegistry;
use crate::services::retry_schedule::RetrySchedule;
use crate::services::{ConvergenceLoop, LearningStore};

/// Fully wired engine: HTTP provider chains, learning store, optimizer.
pub struct Engine {
    optimizer: Arc<Optimizer>,
}

impl Engine {
    /// Wire everything up from configuration.
    ///
    /// # Errors
    /// Fails when a provider HTTP client cannot be built or the config
    /// names no providers for one of the chains.
    pub fn from_config(config: &Config) -> Result<Self> {
        anyhow::ensure!(
            !config.providers.generation.is_empty(),
            "no generation providers configured"
        );
        anyhow::ensure!(
            !config.providers.detection.is_empty(),
            "no detection providers configured"
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let breaker_config = CircuitBreakerConfig::from(&config.breaker);
        let schedule = RetrySchedule::from(&config.retry);

        let mut generators: ProviderRegistry<dyn Generator> =
            ProviderRegistry::new(breaker_config.clone(), clock.clone());
        for endpoint in &config.providers.generation {
            let provider = HttpGenerator::new(endpoint.clone())
                .with_context(|| format!("building generation provider '{}'", endpoint.name))?;
            generators.register(descriptor(endpoint), Arc::new(provider));
        }

        let mut detectors: ProviderRegistry<dyn Detector> =
            ProviderRegistry::new(breaker_config, clock.clone());
        for endpoint in &config.providers.detection {
            let provider = HttpDetector::new(endpoint.clone())
                .with_context(|| format!("building detection provider '{}'", endpoint.name))?;
            detectors.register(descriptor(endpoint), Arc::new(provider));
        }

        let convergence = Arc::new(ConvergenceLoop::new(
            FallbackExecutor::new(Arc::new(generators), schedule.clone(), clock.clone()),
            FallbackExecutor::new(Arc::new(detectors), schedule, clock.clone()),
            clock,
        ));

        let history = JsonHistoryStore::new(config.learning.history_path.clone());
        let learning = Arc::new(
            LearningStore::new(Arc::new(history), config.learning.clone())
                .with_defaults(RunConfig::from(&config.convergence)),
        );

        Ok(Self {
            optimizer: Arc::new(Optimizer::new(convergence, learning)),
        })
    }

    /// Optimize one subject end to end.
    pub async fn optimize(&self, subject: &Subject) -> Result<ConvergenceOutcome> {
        self.optimizer.optimize(subject).await
    }

    /// Optimize many subjects concurrently, one task each.
    pub async fn optimize_all(
        &self,
        subjects: Vec<Subject>,
    ) -> Vec<(String, Result<ConvergenceOutcome>)> {
        self.optimizer.optimize_all(subjects).await
    }

    /// Cancel all active runs gracefully.
    pub fn shutdown(&self) {
        self.optimizer.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

fn descriptor(endpoint: &ProviderEndpointConfig) -> ProviderDescriptor {
    ProviderDescriptor::new(endpoint.name.clone(), endpoint.priority)
}
