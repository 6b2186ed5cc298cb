//! Provider identity and health accounting.

use serde::{Deserialize, Serialize};

/// Identity and fallback rank of a registered provider.
///
/// Owned exclusively by the provider registry; lower `priority` is tried
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider name, unique within one registry.
    pub name: String,
    /// Position in the fallback order (lower is tried first).
    pub priority: u32,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }
}

/// Append-only request counters for one provider, process-lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderHealthStats {
    /// Completed attempts, successful or not.
    pub total_requests: u64,
    /// Attempts that returned a result.
    pub success_count: u64,
    /// Rolling average response time for successful attempts, milliseconds.
    pub avg_response_ms: f64,
}

impl ProviderHealthStats {
    /// Record a successful attempt and fold its response time into the
    /// rolling average: first sample seeds the average, later samples halve
    /// toward it.
    pub fn record_success(&mut self, response_ms: f64) {
        self.total_requests += 1;
        self.success_count += 1;
        self.avg_response_ms = if self.avg_response_ms == 0.0 {
            response_ms
        } else {
            (self.avg_response_ms + response_ms) / 2.0
        };
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self) {
        self.total_requests += 1;
    }

    /// Fraction of attempts that succeeded, 0.0 when nothing was recorded.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                self.success_count as f64 / self.total_requests as f64
            }
        }
    }
}
