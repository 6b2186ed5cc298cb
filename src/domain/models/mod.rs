pub mod config;
pub mod content;
pub mod history;
pub mod provider;
pub mod run;

pub use config::{
    BreakerSettings, Config, ConvergenceSettings, LearningSettings, LoggingConfig,
    ProviderEndpointConfig, ProvidersConfig, RetrySettings,
};
pub use content::{
    Classification, DetectionReport, GeneratedDraft, GenerationRequest, Subject, TokenUsage,
};
pub use history::{RunSummary, SubjectHistory};
pub use provider::{ProviderDescriptor, ProviderHealthStats};
pub use run::{AttemptRecord, ConvergenceOutcome, RunConfig, TerminationReason};
