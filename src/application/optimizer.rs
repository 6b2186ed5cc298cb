//! Batch orchestration over the convergence engine.
//!
//! Ties the learning store and the convergence loop together per subject:
//! suggest a config from history, run the loop, record the outcome. Subjects
//! run as independent tasks; one subject failing never stops the others.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::domain::models::{ConvergenceOutcome, Subject};
use crate::services::{ConvergenceLoop, LearningStore};

/// Runs subjects through the suggest / converge / record cycle.
pub struct Optimizer {
    convergence: Arc<ConvergenceLoop>,
    learning: Arc<LearningStore>,
}

impl Optimizer {
    pub fn new(convergence: Arc<ConvergenceLoop>, learning: Arc<LearningStore>) -> Self {
        Self {
            convergence,
            learning,
        }
    }

    /// Optimize a single subject end to end.
    ///
    /// The starting configuration comes from the subject's history; the
    /// outcome is recorded back so the next run starts smarter.
    pub async fn optimize(&self, subject: &Subject) -> Result<ConvergenceOutcome> {
        let current_score = self
            .learning
            .history(&subject.name)
            .await
            .context("loading subject history")?
            .and_then(|history| history.latest_run().map(|run| run.final_score));

        let config = self
            .learning
            .suggest_config(&subject.name, current_score)
            .await
            .context("deriving run configuration")?;

        let outcome = self
            .convergence
            .run(subject, config)
            .await
            .with_context(|| format!("convergence run for '{}'", subject.name))?;

        self.learning
            .record(&outcome)
            .await
            .context("recording run outcome")?;

        info!(
            subject = %subject.name,
            score = outcome.score,
            iterations = outcome.iterations,
            succeeded = outcome.succeeded,
            "subject optimized"
        );
        Ok(outcome)
    }

    /// Optimize many subjects concurrently.
    ///
    /// Each subject runs in its own task; the returned list pairs every
    /// subject name with its result, failures included.
    pub async fn optimize_all(
        self: &Arc<Self>,
        subjects: Vec<Subject>,
    ) -> Vec<(String, Result<ConvergenceOutcome>)> {
        let mut tasks = JoinSet::new();
        for subject in subjects {
            let optimizer = Arc::clone(self);
            tasks.spawn(async move {
                let result = optimizer.optimize(&subject).await;
                (subject.name, result)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    if let Err(err) = &result {
                        error!(subject = %name, error = %err, "subject optimization failed");
                    }
                    results.push((name, result));
                }
                Err(join_err) => {
                    error!(error = %join_err, "optimization task panicked");
                }
            }
        }
        results
    }

    /// Cancel all active runs, leaving each with its best partial result.
    pub fn shutdown(&self) {
        self.convergence.shutdown();
    }
}
