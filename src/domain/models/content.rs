//! Content units exchanged with generation and detection providers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The unit of work being optimized: one content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Stable key used for optimization history ("rust-async-primer").
    pub name: String,
    /// What the content should cover.
    pub brief: String,
}

impl Subject {
    pub fn new(name: impl Into<String>, brief: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            brief: brief.into(),
        }
    }
}

/// Token accounting reported by a generation provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A request to a generation provider.
///
/// After the first draft, the fields past `brief` carry improvement context:
/// the latest score, its classification, and the mutation hints the learning
/// store suggested for this subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Subject key.
    pub subject: String,
    /// Content brief.
    pub brief: String,
    /// Draft from the previous iteration, absent for the initial draft.
    pub previous_draft: Option<String>,
    /// Score the previous draft received.
    pub last_score: Option<f64>,
    /// Classification the previous draft received.
    pub last_classification: Option<Classification>,
    /// Style/mutation hints carried over from past successful runs.
    pub hints: Vec<String>,
    /// 1-indexed iteration within the convergence run, 0 for the seed draft.
    pub iteration: u32,
}

impl GenerationRequest {
    /// Request for the initial draft of a subject.
    pub fn initial(subject: &Subject, hints: Vec<String>) -> Self {
        Self {
            subject: subject.name.clone(),
            brief: subject.brief.clone(),
            previous_draft: None,
            last_score: None,
            last_classification: None,
            hints,
            iteration: 0,
        }
    }

    /// Request for a rewrite of `previous_draft` informed by its report.
    pub fn rewrite(
        subject: &Subject,
        previous_draft: String,
        report: &DetectionReport,
        hints: Vec<String>,
        iteration: u32,
    ) -> Self {
        Self {
            subject: subject.name.clone(),
            brief: subject.brief.clone(),
            previous_draft: Some(previous_draft),
            last_score: Some(report.score),
            last_classification: Some(report.classification),
            hints,
            iteration,
        }
    }
}

/// Output of one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDraft {
    pub content: String,
    pub token_usage: TokenUsage,
}

/// How a detector classified a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Reads as human-authored.
    Human,
    /// Detector could not commit either way.
    Uncertain,
    /// Reads as machine-generated.
    Synthetic,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Uncertain => "uncertain",
            Self::Synthetic => "synthetic",
        }
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "uncertain" => Ok(Self::Uncertain),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(format!("unknown classification: {other}")),
        }
    }
}

/// Output of one detection/scoring call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Authenticity/quality score, 0-100, higher is better.
    pub score: f64,
    pub classification: Classification,
    /// Detector's confidence in its classification, 0.0-1.0.
    pub confidence: f64,
    /// Free-form detector detail, passed through to improvement context.
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_round_trips_through_str() {
        for c in [
            Classification::Human,
            Classification::Uncertain,
            Classification::Synthetic,
        ] {
            assert_eq!(c.as_str().parse::<Classification>().unwrap(), c);
        }
        assert!("robot".parse::<Classification>().is_err());
    }

    #[test]
    fn rewrite_request_carries_improvement_context() {
        let subject = Subject::new("topic", "write about topic");
        let report = DetectionReport {
            score: 62.0,
            classification: Classification::Uncertain,
            confidence: 0.7,
            details: None,
        };

        let req = GenerationRequest::rewrite(
            &subject,
            "draft v1".into(),
            &report,
            vec!["more first-person anecdotes".into()],
            3,
        );

        assert_eq!(req.previous_draft.as_deref(), Some("draft v1"));
        assert_eq!(req.last_score, Some(62.0));
        assert_eq!(req.last_classification, Some(Classification::Uncertain));
        assert_eq!(req.iteration, 3);
    }

    #[test]
    fn initial_request_has_no_previous_context() {
        let subject = Subject::new("topic", "brief");
        let req = GenerationRequest::initial(&subject, vec![]);
        assert!(req.previous_draft.is_none());
        assert!(req.last_score.is_none());
        assert_eq!(req.iteration, 0);
    }
}
