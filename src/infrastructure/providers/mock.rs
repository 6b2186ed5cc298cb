//! Scripted in-memory providers.
//!
//! Used by integration tests and dry runs: behavior is fully determined by
//! the queued script, with a deterministic fallback once the script runs out.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::errors::ProviderError;
use crate::domain::models::{
    Classification, DetectionReport, GeneratedDraft, GenerationRequest, TokenUsage,
};
use crate::domain::ports::{Detector, Generator};

/// Generator that replays a script of outcomes.
///
/// When the script is empty it echoes a deterministic draft derived from
/// the request, so open-ended runs never panic.
#[derive(Default)]
pub struct MockGenerator {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a draft to be returned by a future call.
    pub fn push_draft(&self, content: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(content.into()));
    }

    /// Queue a failure to be returned by a future call.
    pub fn push_error(&self, error: ProviderError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedDraft, ProviderError> {
        let scripted = self.script.lock().unwrap().pop_front();
        let iteration = request.iteration;
        let subject = request.subject.clone();
        self.requests.lock().unwrap().push(request);

        let content = match scripted {
            Some(Ok(content)) => content,
            Some(Err(error)) => return Err(error),
            None => format!("iteration {iteration} draft for {subject}"),
        };
        Ok(GeneratedDraft {
            content,
            token_usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 500,
            },
        })
    }
}

/// Detector that replays a script of scores.
///
/// An empty script falls back to a fixed score so runs stay deterministic.
pub struct MockDetector {
    script: Mutex<VecDeque<Result<f64, ProviderError>>>,
    fallback_score: f64,
}

impl MockDetector {
    pub fn new(fallback_score: f64) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback_score,
        }
    }

    /// Detector replaying the given scores, then the fallback.
    pub fn with_scores(fallback_score: f64, scores: impl IntoIterator<Item = f64>) -> Self {
        let detector = Self::new(fallback_score);
        {
            let mut script = detector.script.lock().unwrap();
            script.extend(scores.into_iter().map(Ok));
        }
        detector
    }

    /// Queue a failure to be returned by a future call.
    pub fn push_error(&self, error: ProviderError) {
        self.script.lock().unwrap().push_back(Err(error));
    }
}

#[async_trait]
impl Detector for MockDetector {
    async fn score(&self, _content: &str) -> Result<DetectionReport, ProviderError> {
        let score = match self.script.lock().unwrap().pop_front() {
            Some(Ok(score)) => score,
            Some(Err(error)) => return Err(error),
            None => self.fallback_score,
        };
        Ok(DetectionReport {
            score,
            classification: if score >= 70.0 {
                Classification::Human
            } else if score >= 40.0 {
                Classification::Uncertain
            } else {
                Classification::Synthetic
            },
            confidence: 0.9,
            details: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Subject;

    #[tokio::test]
    async fn generator_replays_script_then_echoes() {
        let generator = MockGenerator::new();
        generator.push_draft("scripted draft");

        let request = GenerationRequest::initial(&Subject::new("wasm", "brief"), vec![]);
        let first = generator.generate(request.clone()).await.unwrap();
        let second = generator.generate(request).await.unwrap();

        assert_eq!(first.content, "scripted draft");
        assert_eq!(second.content, "iteration 0 draft for wasm");
        assert_eq!(generator.requests().len(), 2);
    }

    #[tokio::test]
    async fn detector_scores_then_falls_back() {
        let detector = MockDetector::with_scores(50.0, [30.0, 75.0]);

        let first = detector.score("x").await.unwrap();
        let second = detector.score("x").await.unwrap();
        let third = detector.score("x").await.unwrap();

        assert_eq!(first.classification, Classification::Synthetic);
        assert_eq!(second.classification, Classification::Human);
        assert!((third.score - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn scripted_errors_surface() {
        let generator = MockGenerator::new();
        generator.push_error(ProviderError::Transport("socket reset".into()));

        let request = GenerationRequest::initial(&Subject::new("wasm", "brief"), vec![]);
        let err = generator.generate(request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
