//! History store backed by a single pretty-printed JSON file.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::errors::StoreResult;
use crate::domain::models::SubjectHistory;
use crate::domain::ports::HistoryStore;

/// Stores the full subject-history map in one JSON document.
///
/// Saves write a sibling temp file and rename it over the target, so a crash
/// mid-save leaves the previous file intact rather than a torn one.
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn load_all(&self) -> StoreResult<HashMap<String, SubjectHistory>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let histories: HashMap<String, SubjectHistory> = serde_json::from_str(&raw)?;
                debug!(path = %self.path.display(), subjects = histories.len(), "loaded history file");
                Ok(histories)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no history file yet, starting empty");
                Ok(HashMap::new())
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read history file");
                Err(err.into())
            }
        }
    }

    async fn save_all(&self, histories: &HashMap<String, SubjectHistory>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let serialized = serde_json::to_string_pretty(histories)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized.as_bytes()).await?;
        fs::rename(&tmp_path, &self.path).await?;

        debug!(path = %self.path.display(), subjects = histories.len(), "saved history file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{RunConfig, RunSummary};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_history(subject: &str, final_score: f64) -> SubjectHistory {
        let mut history = SubjectHistory::new(subject);
        history.record(RunSummary {
            run_id: Uuid::new_v4(),
            initial_score: 40.0,
            final_score,
            iterations: 5,
            succeeded: true,
            config: RunConfig::default(),
            completed_at: Utc::now(),
        });
        history
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));

        let histories = store.load_all().await.unwrap();
        assert!(histories.is_empty());
    }

    #[tokio::test]
    async fn round_trips_through_the_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));

        let mut histories = HashMap::new();
        histories.insert("wasm".to_string(), sample_history("wasm", 82.0));
        store.save_all(&histories).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        let history = loaded.get("wasm").unwrap();
        assert_eq!(history.runs.len(), 1);
        assert!((history.best_score_ever - 82.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn save_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("nested/deeper/history.json"));

        store.save_all(&HashMap::new()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));

        let mut histories = HashMap::new();
        histories.insert("ebpf".to_string(), sample_history("ebpf", 74.0));
        store.save_all(&histories).await.unwrap();

        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, b"not json at all").await.unwrap();
        let store = JsonHistoryStore::new(path);

        let err = store.load_all().await.unwrap_err();
        assert!(matches!(
            err,
            crate::domain::errors::StoreError::Serialization(_)
        ));
    }
}
