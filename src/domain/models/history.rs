//! Persisted per-subject optimization history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::run::{ConvergenceOutcome, RunConfig};

/// Summary of one completed convergence run, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub initial_score: f64,
    pub final_score: f64,
    pub iterations: u32,
    pub succeeded: bool,
    /// Configuration the run used, including its mutation hints.
    pub config: RunConfig,
    pub completed_at: DateTime<Utc>,
}

impl RunSummary {
    /// Score delta achieved by the run.
    pub fn improvement(&self) -> f64 {
        self.final_score - self.initial_score
    }
}

impl From<&ConvergenceOutcome> for RunSummary {
    fn from(outcome: &ConvergenceOutcome) -> Self {
        Self {
            run_id: outcome.run_id,
            initial_score: outcome.initial_score,
            final_score: outcome.score,
            iterations: outcome.iterations,
            succeeded: outcome.succeeded,
            config: outcome.config.clone(),
            completed_at: Utc::now(),
        }
    }
}

/// Everything remembered about one subject across process restarts.
///
/// Created on the first run for a subject, appended on every subsequent run,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectHistory {
    pub subject: String,
    /// Past runs, oldest first.
    pub runs: Vec<RunSummary>,
    /// Highest final score any run has achieved.
    pub best_score_ever: f64,
}

impl SubjectHistory {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            runs: Vec::new(),
            best_score_ever: 0.0,
        }
    }

    /// Append a run summary and fold its score into `best_score_ever`.
    pub fn record(&mut self, summary: RunSummary) {
        if summary.final_score > self.best_score_ever {
            self.best_score_ever = summary.final_score;
        }
        self.runs.push(summary);
    }

    /// Most recent run first.
    pub fn latest_run(&self) -> Option<&RunSummary> {
        self.runs.last()
    }
}
