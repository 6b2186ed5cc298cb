//! Detection/scoring provider port.

use async_trait::async_trait;

use crate::domain::errors::ProviderError;
use crate::domain::models::DetectionReport;

/// Interface to an external content-authenticity detection provider.
///
/// Only the contract matters to the engine: a 0-100 score plus a
/// classification. The scoring heuristics behind it are opaque.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Score a piece of content.
    async fn score(&self, content: &str) -> Result<DetectionReport, ProviderError>;
}
