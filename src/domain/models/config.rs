//! Configuration model for the draftforge engine.
//!
//! Loaded by `infrastructure::config::ConfigLoader` via figment with
//! hierarchical merging (defaults, YAML files, `DRAFTFORGE_*` env vars).

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub breaker: BreakerSettings,
    pub retry: RetrySettings,
    pub convergence: ConvergenceSettings,
    pub learning: LearningSettings,
    pub logging: LoggingConfig,
}

/// The two provider chains, each in fallback priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub generation: Vec<ProviderEndpointConfig>,
    pub detection: Vec<ProviderEndpointConfig>,
}

/// One HTTP provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpointConfig {
    /// Unique provider name within its chain.
    pub name: String,
    /// Fallback rank, lower tried first.
    pub priority: u32,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Environment variable holding the API key, if the provider needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Model identifier passed through to the provider.
    #[serde(default)]
    pub model: Option<String>,
    /// Outer request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_timeout_secs() -> u64 {
    120
}

/// Circuit breaker settings, shared by every provider's breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Counted failures before the circuit opens.
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before probing.
    pub recovery_timeout_secs: u64,
    /// Successes required in half-open to close again.
    pub success_threshold: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            success_threshold: 2,
        }
    }
}

/// Retry envelope settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the initial attempt, per provider.
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter as a fraction of the computed delay, 0.0-1.0.
    pub jitter_factor: f64,
    /// Floor so retries never fire with zero delay, milliseconds.
    pub min_delay_ms: u64,
    /// Base connect timeout in milliseconds, scaled per attempt.
    pub connect_timeout_ms: u64,
    /// Base read timeout in milliseconds, scaled per attempt.
    pub read_timeout_ms: u64,
    /// Upper bound on connect + read for one attempt, milliseconds.
    pub total_timeout_budget_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.25,
            min_delay_ms: 100,
            connect_timeout_ms: 5_000,
            read_timeout_ms: 60_000,
            total_timeout_budget_ms: 120_000,
        }
    }
}

/// Default convergence loop parameters, used when the learning store has no
/// history for a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    pub target_score: f64,
    pub max_iterations: u32,
    pub improvement_threshold: f64,
    pub consecutive_failure_limit: u32,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            target_score: 70.0,
            max_iterations: 8,
            improvement_threshold: 2.0,
            consecutive_failure_limit: 3,
        }
    }
}

/// Learning store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningSettings {
    /// Path of the JSON history file.
    pub history_path: String,
    /// Ceiling for adaptively raised targets.
    pub target_cap: f64,
    /// Margin added above `best_score_ever` when raising the target.
    pub target_margin: f64,
    /// Floor for derived iteration budgets.
    pub min_iterations: u32,
    /// Multiplier applied to the average successful iteration count.
    pub iteration_headroom: f64,
    /// Score past which the diminishing-returns regime kicks in.
    pub high_water_score: f64,
    /// Improvement-threshold factor applied in the diminishing regime.
    pub diminishing_threshold_factor: f64,
    /// Extra iterations granted in the diminishing regime.
    pub diminishing_extra_iterations: u32,
}

impl Default for LearningSettings {
    fn default() -> Self {
        Self {
            history_path: ".draftforge/history.json".to_string(),
            target_cap: 95.0,
            target_margin: 5.0,
            min_iterations: 3,
            iteration_headroom: 1.2,
            high_water_score: 80.0,
            diminishing_threshold_factor: 0.5,
            diminishing_extra_iterations: 2,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, or error.
    pub level: String,
    /// json or pretty.
    pub format: String,
    /// When set, JSON logs are also written to daily-rotated files here.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            log_dir: None,
        }
    }
}
