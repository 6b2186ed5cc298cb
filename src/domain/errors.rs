//! Domain errors for the draftforge engine.

use std::time::Duration;
use thiserror::Error;

/// Format the per-provider failure list as `name: error; name: error`.
fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ProviderFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by an individual provider call.
///
/// The taxonomy drives both retry policy and circuit breaker accounting:
/// transport and provider errors trip breakers, rate limits do not.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Connection failure or timeout. Retried, counts toward the breaker.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Provider asked us to slow down. Retried after the hinted delay,
    /// does not count toward the breaker.
    #[error("rate limited by provider")]
    RateLimited {
        /// Provider-supplied delay hint, when present.
        retry_after: Option<Duration>,
    },

    /// Semantic or validation failure from the provider. Counts toward the
    /// breaker but is not retried against the same provider.
    #[error("provider rejected request: {0}")]
    Provider(String),
}

impl ProviderError {
    /// Whether retrying the same provider can plausibly help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited { .. })
    }

    /// Whether this failure kind is counted by circuit breakers.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Provider(_))
    }
}

/// How a provider was disposed of during one fallback pass.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// Breaker reported the provider unavailable; no attempt was made.
    Skipped,
    /// Retries were exhausted (or the error was permanent).
    Failed(ProviderError),
}

/// One entry in the aggregated failure list of a fallback pass.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    /// Provider name.
    pub provider: String,
    /// What happened to it.
    pub outcome: AttemptOutcome,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Skipped => write!(f, "{}: circuit open", self.provider),
            AttemptOutcome::Failed(err) => write!(f, "{}: {}", self.provider, err),
        }
    }
}

/// Terminal failure for one fallback execution: every provider in the chain
/// was either skipped by its breaker or exhausted its retries.
#[derive(Debug, Clone, Error)]
#[error("all providers failed for {operation}: {}", format_failures(failures))]
pub struct AllProvidersFailed {
    /// Logical operation name ("generate", "score", ...).
    pub operation: String,
    /// Per-provider dispositions, in the order providers were considered.
    pub failures: Vec<ProviderFailure>,
}

impl AllProvidersFailed {
    /// Names of providers that were actually attempted (not skipped).
    pub fn attempted_providers(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| matches!(f.outcome, AttemptOutcome::Failed(_)))
            .map(|f| f.provider.as_str())
            .collect()
    }
}

/// Errors from the history persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("history store serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_provider_trip_breaker() {
        assert!(ProviderError::Transport("timeout".into()).trips_breaker());
        assert!(ProviderError::Provider("bad prompt".into()).trips_breaker());
        assert!(!ProviderError::RateLimited { retry_after: None }.trips_breaker());
    }

    #[test]
    fn provider_errors_are_not_retryable() {
        assert!(ProviderError::Transport("reset".into()).is_retryable());
        assert!(ProviderError::RateLimited { retry_after: None }.is_retryable());
        assert!(!ProviderError::Provider("invalid".into()).is_retryable());
    }

    #[test]
    fn all_providers_failed_display_lists_each_provider() {
        let err = AllProvidersFailed {
            operation: "generate".into(),
            failures: vec![
                ProviderFailure {
                    provider: "primary".into(),
                    outcome: AttemptOutcome::Skipped,
                },
                ProviderFailure {
                    provider: "backup".into(),
                    outcome: AttemptOutcome::Failed(ProviderError::Transport("refused".into())),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("primary: circuit open"));
        assert!(msg.contains("backup: transport failure: refused"));
        assert_eq!(err.attempted_providers(), vec!["backup"]);
    }
}
