//! Persistence port for subject optimization histories.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::StoreResult;
use crate::domain::models::SubjectHistory;

/// Keyed record store mapping subject names to their histories.
///
/// Any durable key-value or document store suffices; a full rewrite on each
/// save is acceptable, but a save must be all-or-nothing.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load every stored history. Called once at startup.
    async fn load_all(&self) -> StoreResult<HashMap<String, SubjectHistory>>;

    /// Persist the full history map.
    async fn save_all(&self, histories: &HashMap<String, SubjectHistory>) -> StoreResult<()>;
}
