//! Per-subject run history and adaptive configuration.
//!
//! The store loads its history file once, serves every read from the
//! in-memory cache, and rewrites the whole file after each recorded run.
//! Config suggestions are a deterministic function of the cached history:
//! the same snapshot always yields the same `RunConfig`.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::domain::errors::StoreResult;
use crate::domain::models::{ConvergenceOutcome, LearningSettings, RunConfig, RunSummary, SubjectHistory};
use crate::domain::ports::HistoryStore;

/// Remembers how past runs went per subject and tunes the next run's config.
pub struct LearningStore {
    store: Arc<dyn HistoryStore>,
    settings: LearningSettings,
    defaults: RunConfig,
    cache: RwLock<Option<HashMap<String, SubjectHistory>>>,
    // Serializes record() calls so concurrent subject runs never interleave
    // partial rewrites of the history file.
    write_lock: Mutex<()>,
}

impl LearningStore {
    pub fn new(store: Arc<dyn HistoryStore>, settings: LearningSettings) -> Self {
        Self {
            store,
            settings,
            defaults: RunConfig::default(),
            cache: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Override the baseline config used when history gives no guidance.
    #[must_use]
    pub fn with_defaults(mut self, defaults: RunConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Derive the starting configuration for the next run on `subject`.
    ///
    /// With no history this is the baseline config. Otherwise past runs
    /// whose score delta beat the default improvement threshold count as
    /// successful and shape the suggestion: the most recent one's hints are
    /// reused, the target is raised toward `best_score_ever`, and the
    /// iteration budget follows the average successful run length. When
    /// `current_score` already sits past the high-water mark, the threshold
    /// tightens and the budget widens to chase smaller gains.
    pub async fn suggest_config(
        &self,
        subject: &str,
        current_score: Option<f64>,
    ) -> StoreResult<RunConfig> {
        self.ensure_loaded().await?;

        let cache = self.cache.read().await;
        let histories = cache.as_ref().expect("cache loaded above");
        let Some(history) = histories.get(subject) else {
            debug!(subject, "no history, suggesting defaults");
            return Ok(self.defaults.clone());
        };

        let mut config = self.defaults.clone();

        let successful: Vec<&RunSummary> = history
            .runs
            .iter()
            .filter(|run| run.improvement() > config.improvement_threshold)
            .collect();

        if let Some(latest) = successful.last() {
            config.hints = latest.config.hints.clone();

            let total: u32 = successful.iter().map(|run| run.iterations).sum();
            #[allow(clippy::cast_precision_loss)]
            let avg = f64::from(total) / successful.len() as f64;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let budget = (avg * self.settings.iteration_headroom) as u32;
            config.max_iterations = budget.max(self.settings.min_iterations);
        }

        let raised =
            (history.best_score_ever + self.settings.target_margin).min(self.settings.target_cap);
        config.target_score = config.target_score.max(raised);

        if current_score.is_some_and(|score| score >= self.settings.high_water_score) {
            config.improvement_threshold *= self.settings.diminishing_threshold_factor;
            config.max_iterations += self.settings.diminishing_extra_iterations;
        }

        debug!(
            subject,
            target = config.target_score,
            budget = config.max_iterations,
            threshold = config.improvement_threshold,
            "suggested adaptive config"
        );
        Ok(config)
    }

    /// Record a finished run and persist the full history.
    pub async fn record(&self, outcome: &ConvergenceOutcome) -> StoreResult<()> {
        self.ensure_loaded().await?;
        let _writer = self.write_lock.lock().await;

        let snapshot = {
            let mut cache = self.cache.write().await;
            let histories = cache.as_mut().expect("cache loaded above");
            let history = histories
                .entry(outcome.subject.clone())
                .or_insert_with(|| SubjectHistory::new(outcome.subject.clone()));
            history.record(RunSummary::from(outcome));
            histories.clone()
        };

        self.store.save_all(&snapshot).await?;
        info!(
            subject = %outcome.subject,
            score = outcome.score,
            succeeded = outcome.succeeded,
            "recorded run outcome"
        );
        Ok(())
    }

    /// Cached history for one subject, if any runs have been recorded.
    pub async fn history(&self, subject: &str) -> StoreResult<Option<SubjectHistory>> {
        self.ensure_loaded().await?;
        let cache = self.cache.read().await;
        Ok(cache
            .as_ref()
            .expect("cache loaded above")
            .get(subject)
            .cloned())
    }

    async fn ensure_loaded(&self) -> StoreResult<()> {
        if self.cache.read().await.is_some() {
            return Ok(());
        }
        let mut cache = self.cache.write().await;
        if cache.is_none() {
            let histories = self.store.load_all().await?;
            info!(subjects = histories.len(), "loaded run history");
            *cache = Some(histories);
        }
        Ok(())
    }
}
