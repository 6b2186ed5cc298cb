//! Draftforge - Resilient Content Convergence Engine
//!
//! Draftforge iteratively generates and scores technical marketing drafts
//! until they converge on a quality target, surviving flaky providers along
//! the way: every generation and detection call goes through a prioritized
//! fallback chain with per-provider circuit breakers and retry envelopes,
//! and finished runs feed a learning store that tunes the next run's
//! configuration per subject.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, ports, and the error taxonomy
//! - **Service Layer** (`services`): Circuit breaker, retry scheduling,
//!   fallback execution, the convergence loop, and the learning store
//! - **Application Layer** (`application`): Per-subject and batch orchestration
//! - **Infrastructure Layer** (`infrastructure`): Config, logging, JSON
//!   persistence, and HTTP provider adapters
//!
//! # Example
//!
//! ```ignore
//! use draftforge::{ConfigLoader, Engine, Subject};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let engine = Engine::from_config(&config)?;
//!     let outcome = engine
//!         .optimize(&Subject::new("edge-caching", "Explain edge caching tradeoffs"))
//!         .await?;
//!     println!("{}: {:.1}", outcome.subject, outcome.score);
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::Optimizer;
pub use domain::errors::{AllProvidersFailed, ProviderError, StoreError};
pub use domain::models::{
    Classification, Config, ConvergenceOutcome, DetectionReport, GeneratedDraft,
    GenerationRequest, RunConfig, Subject, SubjectHistory, TerminationReason,
};
pub use domain::ports::{Clock, Detector, Generator, HistoryStore, SystemClock};
pub use engine::Engine;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::Logger;
pub use services::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, ConvergenceLoop, FallbackExecutor,
    LearningStore, ProviderRegistry, RetrySchedule,
};
