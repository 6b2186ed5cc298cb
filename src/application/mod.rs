//! Application layer: orchestration over the domain services.

pub mod optimizer;

pub use optimizer::Optimizer;
