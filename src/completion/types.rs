//! Request and response types for the completion boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One prompt submitted to the completion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The prompt text.
    pub prompt: String,
    /// Model name.
    pub model: String,
    /// Token limit for the generated text.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// One proposed output from the completion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Generated text.
    pub text: String,
    /// Why generation stopped ("stop", "length", ...), if reported.
    pub finish_reason: Option<String>,
}

/// A raw API response: zero or more candidates plus response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Response identifier assigned by the API.
    pub id: String,
    /// Model that produced the response.
    pub model: String,
    /// Creation time reported by the API.
    pub created: DateTime<Utc>,
    /// Candidate outputs. The retry policy only accepts exactly one.
    pub candidates: Vec<Candidate>,
}

/// An accepted completion: one candidate plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Accepted candidate text, with any validation token already stripped.
    pub text: String,
    /// Response identifier assigned by the API.
    pub id: String,
    /// Model that produced the response.
    pub model: String,
    /// Creation time reported by the API.
    pub created: DateTime<Utc>,
    /// Why generation stopped, if reported.
    pub finish_reason: Option<String>,
    /// Attempt number (1-based) that produced this answer.
    pub attempts: u32,
}

/// Final outcome of a completion request after the retry budget.
///
/// Exhausting the budget is an explicit outcome, never an error: a failed
/// prompt must not crash or stop the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// A candidate was accepted.
    Answer(Answer),
    /// Every attempt failed or was rejected.
    NoResult {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl CompletionOutcome {
    pub fn is_answer(&self) -> bool {
        matches!(self, CompletionOutcome::Answer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serialization_is_tagged() {
        let outcome = CompletionOutcome::NoResult { attempts: 3 };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""outcome":"no_result""#));

        let parsed: CompletionOutcome = serde_json::from_str(&json).unwrap();
        assert!(!parsed.is_answer());
    }

    #[test]
    fn answer_roundtrip() {
        let outcome = CompletionOutcome::Answer(Answer {
            text: "hello".to_string(),
            id: "cmpl-1".to_string(),
            model: "test-model".to_string(),
            created: Utc::now(),
            finish_reason: Some("stop".to_string()),
            attempts: 2,
        });
        let json = serde_json::to_string(&outcome).unwrap();
        let parsed: CompletionOutcome = serde_json::from_str(&json).unwrap();
        match parsed {
            CompletionOutcome::Answer(a) => {
                assert_eq!(a.text, "hello");
                assert_eq!(a.attempts, 2);
            }
            CompletionOutcome::NoResult { .. } => panic!("expected answer"),
        }
    }
}
