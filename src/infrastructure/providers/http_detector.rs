//! HTTP detection provider adapter.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::ProviderError;
use crate::domain::models::{Classification, DetectionReport, ProviderEndpointConfig};
use crate::domain::ports::Detector;

use super::{map_transport_error, retry_after_hint};

/// Wire request for `POST /v1/detect`.
#[derive(Debug, Serialize)]
struct DetectRequestBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// Wire response for `POST /v1/detect`.
#[derive(Debug, Deserialize)]
struct DetectResponseBody {
    score: f64,
    classification: Classification,
    confidence: f64,
    #[serde(default)]
    details: Option<String>,
}

/// Detector backed by an HTTP scoring endpoint.
pub struct HttpDetector {
    config: ProviderEndpointConfig,
    client: Client,
}

impl HttpDetector {
    /// Build the adapter with its own HTTP client.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: ProviderEndpointConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> Option<String> {
        self.config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn score(&self, content: &str) -> Result<DetectionReport, ProviderError> {
        let url = format!("{}/v1/detect", self.config.base_url.trim_end_matches('/'));
        let body = DetectRequestBody {
            content,
            model: self.config.model.as_deref(),
        };

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(key) = self.api_key() {
            http_request = http_request.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = http_request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after: retry_after_hint(response.headers()),
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(ProviderError::Transport(format!(
                    "{} returned {status}: {detail}",
                    self.config.name
                )));
            }
            return Err(ProviderError::Provider(format!(
                "{} returned {status}: {detail}",
                self.config.name
            )));
        }

        let payload: DetectResponseBody = response
            .json()
            .await
            .map_err(|e| ProviderError::Provider(format!("malformed detect response: {e}")))?;

        if !(0.0..=100.0).contains(&payload.score) {
            return Err(ProviderError::Provider(format!(
                "{} returned out-of-range score {}",
                self.config.name, payload.score
            )));
        }

        debug!(
            provider = %self.config.name,
            score = payload.score,
            classification = payload.classification.as_str(),
            "content scored"
        );

        Ok(DetectionReport {
            score: payload.score,
            classification: payload.classification,
            confidence: payload.confidence,
            details: payload.details,
        })
    }
}
