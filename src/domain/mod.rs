//! Domain layer for the draftforge engine
//!
//! Core models, error taxonomy, and port traits. No I/O lives here.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AllProvidersFailed, ProviderError, StoreError};
