//! Generation provider port.

use async_trait::async_trait;

use crate::domain::errors::ProviderError;
use crate::domain::models::{GeneratedDraft, GenerationRequest};

/// Interface to an external content-generation provider.
///
/// Implementations must be idempotent-safe to retry: a call has no side
/// effects beyond the returned draft.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a draft for the request, which may carry a previous draft
    /// plus scoring feedback as improvement context.
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedDraft, ProviderError>;
}
