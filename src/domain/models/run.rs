//! Per-run configuration, attempt records, and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::ConvergenceSettings;
use super::content::Classification;

/// Configuration for one convergence run.
///
/// Constructed fresh per run, either from defaults or derived by the
/// learning store, and never mutated after the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Score at or above which the run succeeds.
    pub target_score: f64,
    /// Hard iteration budget.
    pub max_iterations: u32,
    /// Minimum score delta counted as progress.
    pub improvement_threshold: f64,
    /// Consecutive non-progressing (or provider-failing) iterations
    /// tolerated before giving up.
    pub consecutive_failure_limit: u32,
    /// Style/mutation hints fed into every generation request.
    #[serde(default)]
    pub hints: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_score: 70.0,
            max_iterations: 8,
            improvement_threshold: 2.0,
            consecutive_failure_limit: 3,
            hints: Vec::new(),
        }
    }
}

impl From<&ConvergenceSettings> for RunConfig {
    fn from(settings: &ConvergenceSettings) -> Self {
        Self {
            target_score: settings.target_score,
            max_iterations: settings.max_iterations,
            improvement_threshold: settings.improvement_threshold,
            consecutive_failure_limit: settings.consecutive_failure_limit,
            hints: Vec::new(),
        }
    }
}

/// One generation attempt within a run. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-indexed iteration, 0 for the seed draft.
    pub iteration: u32,
    pub score: f64,
    pub classification: Classification,
    /// Whether this attempt improved on the best seen so far.
    pub improved: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Why a convergence run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Best score reached the target.
    TargetReached,
    /// Iteration budget spent.
    BudgetExhausted,
    /// Too many consecutive iterations without sufficient improvement.
    Stagnation,
    /// Too many consecutive iterations lost to provider failures.
    ProviderFailures,
    /// Caller cancelled the run; the outcome holds the best seen so far.
    Cancelled,
}

/// Result of one convergence run.
///
/// `content`/`score` always reflect the best-scoring draft observed during
/// the run, never merely the last one generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    pub run_id: Uuid,
    pub subject: String,
    /// Best-scoring content seen during the run.
    pub content: String,
    /// Score of `content`.
    pub score: f64,
    /// Score of the seed draft, before any rewriting.
    pub initial_score: f64,
    /// Rewrite iterations executed (the seed draft is not counted).
    pub iterations: u32,
    pub succeeded: bool,
    pub termination: TerminationReason,
    /// One record per scored draft, in order.
    pub attempts: Vec<AttemptRecord>,
    /// The configuration the run was started with.
    pub config: RunConfig,
}

impl ConvergenceOutcome {
    /// Score improvement over the seed draft.
    pub fn improvement(&self) -> f64 {
        self.score - self.initial_score
    }
}
