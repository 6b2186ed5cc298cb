//! Infrastructure: configuration, logging, persistence, and provider
//! adapters behind the domain ports.

pub mod config;
pub mod history;
pub mod logging;
pub mod providers;
