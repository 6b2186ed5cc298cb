//! Bounded generate-score-decide loop for one subject.
//!
//! Each iteration regenerates the draft with the latest scoring feedback as
//! improvement context, scores the candidate, and decides whether to stop:
//! target reached, budget spent, stagnation, or too many provider failures.
//! The loop always hands back the best-scoring draft observed, never merely
//! the last one generated.

use std::sync::Arc;
use thiserror::Error;
use tokio::select;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::AllProvidersFailed;
use crate::domain::models::{
    AttemptRecord, ConvergenceOutcome, DetectionReport, GeneratedDraft, GenerationRequest,
    RunConfig, Subject, TerminationReason,
};
use crate::domain::ports::{Clock, Detector, Generator};
use crate::services::fallback::FallbackExecutor;

/// Errors that abort a run before any draft exists. Everything after the
/// seed draft produces a (possibly failed) outcome instead of an error.
#[derive(Debug, Error)]
pub enum ConvergenceError {
    /// The seed draft could not be produced or scored at all.
    #[error("initial draft could not be produced: {0}")]
    Bootstrap(#[from] AllProvidersFailed),

    /// The run was cancelled before a seed draft existed, so there is no
    /// partial result to return.
    #[error("run cancelled before any draft was produced")]
    CancelledBeforeDraft,
}

/// Drives repeated generate/score cycles for one subject at a time.
///
/// One instance may be shared across concurrent subject runs; each run's
/// iteration sequence is strictly sequential, and `shutdown` cancels every
/// active run while preserving their best-so-far results.
pub struct ConvergenceLoop {
    generators: FallbackExecutor<dyn Generator>,
    detectors: FallbackExecutor<dyn Detector>,
    clock: Arc<dyn Clock>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ConvergenceLoop {
    pub fn new(
        generators: FallbackExecutor<dyn Generator>,
        detectors: FallbackExecutor<dyn Detector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            generators,
            detectors,
            clock,
            shutdown_tx,
        }
    }

    /// Cancel every active run. In-flight provider calls are aborted;
    /// running `run` calls resolve with their best-so-far partial outcome.
    pub fn shutdown(&self) {
        info!("convergence loop shutdown requested");
        let _ = self.shutdown_tx.send(());
    }

    /// Run one subject to termination.
    pub async fn run(
        &self,
        subject: &Subject,
        config: RunConfig,
    ) -> Result<ConvergenceOutcome, ConvergenceError> {
        let run_id = Uuid::new_v4();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(
            run_id = %run_id,
            subject = %subject.name,
            target = config.target_score,
            budget = config.max_iterations,
            "starting convergence run"
        );

        // Seed draft establishes the baseline; it is not a counted iteration.
        let seed_request = GenerationRequest::initial(subject, config.hints.clone());
        let (seed_draft, seed_report) = select! {
            result = self.draft_and_score(seed_request) => result?,
            _ = shutdown_rx.recv() => return Err(ConvergenceError::CancelledBeforeDraft),
        };

        let initial_score = seed_report.score;
        let mut best_score = seed_report.score;
        let mut best_content = seed_draft.content.clone();
        let mut attempts = vec![self.attempt_record(0, &seed_report, true)];

        if seed_report.score >= config.target_score {
            info!(run_id = %run_id, score = seed_report.score, "seed draft already at target");
            return Ok(self.outcome(
                run_id,
                subject,
                best_content,
                best_score,
                initial_score,
                0,
                TerminationReason::TargetReached,
                attempts,
                config,
            ));
        }

        let mut current = seed_draft.content;
        let mut last_report = seed_report;
        // Two separate consecutive counters, OR-combined for termination:
        // iterations lost to provider failures vs. iterations that scored
        // but did not move the needle enough.
        let mut provider_failures = 0_u32;
        let mut stalls = 0_u32;
        let mut iterations = 0_u32;
        let mut termination = None;

        for iteration in 1..=config.max_iterations {
            let request = GenerationRequest::rewrite(
                subject,
                current.clone(),
                &last_report,
                config.hints.clone(),
                iteration,
            );

            let step = select! {
                result = self.draft_and_score(request) => result,
                _ = shutdown_rx.recv() => {
                    warn!(run_id = %run_id, iteration, "run cancelled, returning best so far");
                    termination = Some(TerminationReason::Cancelled);
                    break;
                }
            };
            iterations = iteration;

            match step {
                Err(err) => {
                    // A failed iteration, not a crash: the run keeps its
                    // best content and may still recover.
                    warn!(run_id = %run_id, iteration, error = %err, "iteration lost to provider failures");
                    provider_failures += 1;
                    if provider_failures >= config.consecutive_failure_limit {
                        termination = Some(TerminationReason::ProviderFailures);
                        break;
                    }
                }
                Ok((draft, report)) => {
                    provider_failures = 0;
                    let best_before = best_score;
                    let improved = report.score > best_score;

                    if improved {
                        best_score = report.score;
                        best_content = draft.content.clone();
                        stalls = 0;
                    }
                    attempts.push(self.attempt_record(iteration, &report, improved));

                    debug!(
                        run_id = %run_id,
                        iteration,
                        score = report.score,
                        best = best_score,
                        "iteration scored"
                    );

                    if report.score >= config.target_score {
                        termination = Some(TerminationReason::TargetReached);
                        break;
                    }

                    let improvement = report.score - best_before;
                    if improvement < config.improvement_threshold {
                        stalls += 1;
                    } else {
                        stalls = 0;
                    }
                    if stalls >= config.consecutive_failure_limit {
                        termination = Some(TerminationReason::Stagnation);
                        break;
                    }

                    current = draft.content;
                    last_report = report;
                }
            }
        }

        let termination = termination.unwrap_or(TerminationReason::BudgetExhausted);
        info!(
            run_id = %run_id,
            subject = %subject.name,
            ?termination,
            iterations,
            best = best_score,
            "convergence run finished"
        );

        Ok(self.outcome(
            run_id,
            subject,
            best_content,
            best_score,
            initial_score,
            iterations,
            termination,
            attempts,
            config,
        ))
    }

    /// One generate+score round trip through the fallback chains.
    async fn draft_and_score(
        &self,
        request: GenerationRequest,
    ) -> Result<(GeneratedDraft, DetectionReport), AllProvidersFailed> {
        let draft = self
            .generators
            .execute("generate", |provider| {
                let request = request.clone();
                async move { provider.generate(request).await }
            })
            .await?
            .value;

        let content = draft.content.clone();
        let report = self
            .detectors
            .execute("score", |provider| {
                let content = content.clone();
                async move { provider.score(&content).await }
            })
            .await?
            .value;

        Ok((draft, report))
    }

    fn attempt_record(&self, iteration: u32, report: &DetectionReport, improved: bool) -> AttemptRecord {
        AttemptRecord {
            iteration,
            score: report.score,
            classification: report.classification,
            improved,
            recorded_at: self.clock.now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn outcome(
        &self,
        run_id: Uuid,
        subject: &Subject,
        content: String,
        score: f64,
        initial_score: f64,
        iterations: u32,
        termination: TerminationReason,
        attempts: Vec<AttemptRecord>,
        config: RunConfig,
    ) -> ConvergenceOutcome {
        let succeeded =
            termination == TerminationReason::TargetReached || score >= config.target_score;
        ConvergenceOutcome {
            run_id,
            subject: subject.name.clone(),
            content,
            score,
            initial_score,
            iterations,
            succeeded,
            termination,
            attempts,
            config,
        }
    }
}
