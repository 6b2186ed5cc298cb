//! Provider adapters: HTTP implementations of the generation and detection
//! ports, plus scripted in-memory providers for tests and dry runs.

pub mod http_detector;
pub mod http_generator;
pub mod mock;

pub use http_detector::HttpDetector;
pub use http_generator::HttpGenerator;
pub use mock::{MockDetector, MockGenerator};

use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

use crate::domain::errors::ProviderError;

/// Map reqwest failures onto the domain taxonomy. Timeouts and connection
/// problems are transport errors; anything else from the client side is a
/// provider error.
fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::Transport(err.to_string())
    } else {
        ProviderError::Provider(err.to_string())
    }
}

/// Seconds-form `Retry-After` header, if present and parseable.
fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
