//! HTTP generation provider adapter.
//!
//! Talks to a draft-generation service over a small JSON POST API and maps
//! transport and status failures onto the domain error taxonomy so the
//! retry and breaker machinery can classify them.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::ProviderError;
use crate::domain::models::{
    GeneratedDraft, GenerationRequest, ProviderEndpointConfig, TokenUsage,
};
use crate::domain::ports::Generator;

use super::{map_transport_error, retry_after_hint};

/// Wire request for `POST /v1/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequestBody<'a> {
    subject: &'a str,
    brief: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_draft: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_classification: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hints: Vec<&'a str>,
    iteration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// Wire response for `POST /v1/generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponseBody {
    content: String,
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Generator backed by an HTTP endpoint.
pub struct HttpGenerator {
    config: ProviderEndpointConfig,
    client: Client,
}

impl HttpGenerator {
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
impl Generator for HttpGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedDraft, ProviderError> {
        let url = format!("{}/v1/generate", self.config.base_url.trim_end_matches('/'));
        let body = GenerateRequestBody {
            subject: &request.subject,
            brief: &request.brief,
            previous_draft: request.previous_draft.as_deref(),
            last_score: request.last_score,
            last_classification: request.last_classification.map(|c| c.as_str()),
            hints: request.hints.iter().map(String::as_str).collect(),
            iteration: request.iteration,
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

        let payload: GenerateResponseBody = response
            .json()
            .await
            .map_err(|e| ProviderError::Provider(format!("malformed generate response: {e}")))?;

        debug!(
            provider = %self.config.name,
            subject = %request.subject,
            iteration = request.iteration,
            output_tokens = payload.output_tokens,
            "draft generated"
        );

        Ok(GeneratedDraft {
            content: payload.content,
            token_usage: TokenUsage {
                input_tokens: payload.input_tokens,
                output_tokens: payload.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Subject;

    fn endpoint(base_url: &str) -> ProviderEndpointConfig {
        ProviderEndpointConfig {
            name: "test-gen".to_string(),
            priority: 1,
            base_url: base_url.to_string(),
            api_key_env: None,
            model: Some("forge-large".to_string()),
            timeout_secs: 5,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::initial(&Subject::new("edge-caching", "explain edge caching"), vec![])
    }

    #[tokio::test]
    async fn parses_successful_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/generate")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(r#"{"content": "a draft", "input_tokens": 12, "output_tokens": 340}"#)
            .create_async()
            .await;

        let generator = HttpGenerator::new(endpoint(&server.url())).unwrap();
        let draft = generator.generate(request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(draft.content, "a draft");
        assert_eq!(draft.token_usage.output_tokens, 340);
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after_hint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/generate")
            .with_status(429)
            .with_header("retry-after", "17")
            .create_async()
            .await;

        let generator = HttpGenerator::new(endpoint(&server.url())).unwrap();
        let err = generator.generate(request()).await.unwrap_err();

        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after: Some(delay)
            } if delay == Duration::from_secs(17)
        ));
    }

    #[tokio::test]
    async fn server_errors_map_to_transport() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/generate")
            .with_status(503)
            .create_async()
            .await;

        let generator = HttpGenerator::new(endpoint(&server.url())).unwrap();
        let err = generator.generate(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn client_errors_map_to_provider() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/generate")
            .with_status(422)
            .with_body("brief too short")
            .create_async()
            .await;

        let generator = HttpGenerator::new(endpoint(&server.url())).unwrap();
        let err = generator.generate(request()).await.unwrap_err();

        match err {
            ProviderError::Provider(message) => assert!(message.contains("brief too short")),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }
}
