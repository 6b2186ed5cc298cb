//! Hierarchical configuration loading.

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Provider '{0}' has an empty base_url")]
    EmptyBaseUrl(String),

    #[error("Duplicate provider name '{0}' in the {1} chain")]
    DuplicateProvider(String, &'static str),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid failure_threshold: {0}. Must be at least 1")]
    InvalidFailureThreshold(u32),

    #[error("Invalid success_threshold: {0}. Must be at least 1")]
    InvalidSuccessThreshold(u32),

    #[error(
        "Invalid backoff configuration: base_delay_ms ({0}) must be less than max_delay_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid jitter_factor: {0}. Must be between 0.0 and 1.0")]
    InvalidJitter(f64),

    #[error("Invalid target_score: {0}. Must be between 0 and 100")]
    InvalidTargetScore(f64),

    #[error("Invalid max_iterations: {0}. Cannot be 0")]
    InvalidMaxIterations(u32),

    #[error("History path cannot be empty")]
    EmptyHistoryPath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .draftforge/config.yaml (project config)
    /// 3. .draftforge/local.yaml (project local overrides, optional)
    /// 4. Environment variables (DRAFTFORGE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".draftforge/config.yaml"))
            .merge(Yaml::file(".draftforge/local.yaml"))
            .merge(Env::prefixed("DRAFTFORGE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for (chain, endpoints) in [
            ("generation", &config.providers.generation),
            ("detection", &config.providers.detection),
        ] {
            let mut seen = std::collections::HashSet::new();
            for endpoint in endpoints {
                if endpoint.base_url.is_empty() {
                    return Err(ConfigError::EmptyBaseUrl(endpoint.name.clone()));
                }
                if !seen.insert(endpoint.name.as_str()) {
                    return Err(ConfigError::DuplicateProvider(
                        endpoint.name.clone(),
                        chain,
                    ));
                }
            }
        }

        if config.breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(
                config.breaker.failure_threshold,
            ));
        }
        if config.breaker.success_threshold == 0 {
            return Err(ConfigError::InvalidSuccessThreshold(
                config.breaker.success_threshold,
            ));
        }

        if config.retry.base_delay_ms >= config.retry.max_delay_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.base_delay_ms,
                config.retry.max_delay_ms,
            ));
        }
        if !(0.0..=1.0).contains(&config.retry.jitter_factor) {
            return Err(ConfigError::InvalidJitter(config.retry.jitter_factor));
        }

        if !(0.0..=100.0).contains(&config.convergence.target_score) {
            return Err(ConfigError::InvalidTargetScore(
                config.convergence.target_score,
            ));
        }
        if config.convergence.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(
                config.convergence.max_iterations,
            ));
        }

        if config.learning.history_path.is_empty() {
            return Err(ConfigError::EmptyHistoryPath);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
