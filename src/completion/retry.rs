//! Retry and validation policy around a completion provider.
//!
//! Policy per attempt: a transport error, an empty candidate list, more than
//! one candidate (ambiguous), or a candidate missing the configured
//! validation token all invalidate the attempt. Exhausting the budget yields
//! an explicit `NoResult`, never an error — one failed prompt must not take
//! the daemon down.

use tracing::{debug, warn};

use super::provider::CompletionProvider;
use super::types::{Answer, CompletionOutcome, CompletionRequest};

/// Retry budget and candidate validation settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts for one prompt. Zero attempts short-circuits to
    /// `NoResult`.
    pub tries: u32,
    /// Required candidate prefix; stripped from accepted answers.
    pub validation_token: Option<String>,
}

impl RetryPolicy {
    pub fn new(tries: u32, validation_token: Option<String>) -> Self {
        Self {
            tries,
            validation_token,
        }
    }
}

/// Drive `provider` until a candidate is accepted or the budget runs out.
pub async fn complete_with_retries(
    provider: &dyn CompletionProvider,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> CompletionOutcome {
    for attempt in 1..=policy.tries {
        let response = match provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(attempt, error = %e, "completion attempt failed");
                continue;
            }
        };

        let candidate = match response.candidates.as_slice() {
            [] => {
                warn!(attempt, id = %response.id, "response carried no candidates");
                continue;
            }
            [one] => one,
            many => {
                // Ambiguous result: retry rather than arbitrarily pick one.
                warn!(
                    attempt,
                    id = %response.id,
                    candidates = many.len(),
                    "ambiguous multi-candidate response"
                );
                continue;
            }
        };

        let text = match &policy.validation_token {
            Some(token) => match candidate.text.strip_prefix(token.as_str()) {
                Some(rest) => rest.to_string(),
                None => {
                    warn!(attempt, id = %response.id, "candidate missing validation token");
                    continue;
                }
            },
            None => candidate.text.clone(),
        };

        debug!(attempt, id = %response.id, model = %response.model, "candidate accepted");
        return CompletionOutcome::Answer(Answer {
            text,
            id: response.id,
            model: response.model,
            created: response.created,
            finish_reason: candidate.finish_reason.clone(),
            attempts: attempt,
        });
    }

    CompletionOutcome::NoResult {
        attempts: policy.tries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::mock::{MockCompletionProvider, MockReply};

    fn request() -> CompletionRequest {
        CompletionRequest {
            prompt: "prompt".to_string(),
            model: "mock".to_string(),
            max_tokens: 8,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let provider = MockCompletionProvider::with_script(vec![
            MockReply::Error("down".to_string()),
            MockReply::Error("still down".to_string()),
            MockReply::Candidates(vec!["answer".to_string()]),
        ]);
        let policy = RetryPolicy::new(3, None);

        let outcome = complete_with_retries(&provider, &request(), &policy).await;
        match outcome {
            CompletionOutcome::Answer(a) => {
                assert_eq!(a.text, "answer");
                assert_eq!(a.attempts, 3);
            }
            CompletionOutcome::NoResult { .. } => panic!("expected answer"),
        }
    }

    #[tokio::test]
    async fn ambiguous_responses_are_retried() {
        let provider = MockCompletionProvider::with_script(vec![
            MockReply::Candidates(vec!["a".to_string(), "b".to_string()]),
            MockReply::Candidates(vec!["picked".to_string()]),
        ]);
        let policy = RetryPolicy::new(2, None);

        let outcome = complete_with_retries(&provider, &request(), &policy).await;
        match outcome {
            CompletionOutcome::Answer(a) => {
                assert_eq!(a.text, "picked");
                assert_eq!(a.attempts, 2);
            }
            CompletionOutcome::NoResult { .. } => panic!("expected answer"),
        }
    }

    #[tokio::test]
    async fn exhausted_budget_yields_no_result() {
        let provider = MockCompletionProvider::with_script(vec![
            MockReply::Candidates(vec![]),
            MockReply::Error("down".to_string()),
            MockReply::Candidates(vec!["x".to_string(), "y".to_string()]),
        ]);
        let policy = RetryPolicy::new(3, None);

        let outcome = complete_with_retries(&provider, &request(), &policy).await;
        match outcome {
            CompletionOutcome::NoResult { attempts } => assert_eq!(attempts, 3),
            CompletionOutcome::Answer(_) => panic!("expected no result"),
        }
    }

    #[tokio::test]
    async fn validation_token_is_stripped() {
        let provider = MockCompletionProvider::with_script(vec![MockReply::Candidates(vec![
            "OK: the real content".to_string(),
        ])]);
        let policy = RetryPolicy::new(1, Some("OK: ".to_string()));

        let outcome = complete_with_retries(&provider, &request(), &policy).await;
        match outcome {
            CompletionOutcome::Answer(a) => assert_eq!(a.text, "the real content"),
            CompletionOutcome::NoResult { .. } => panic!("expected answer"),
        }
    }

    #[tokio::test]
    async fn missing_validation_token_rejects_candidate() {
        let provider = MockCompletionProvider::with_script(vec![
            MockReply::Candidates(vec!["no prefix here".to_string()]),
            MockReply::Candidates(vec!["OK: second try".to_string()]),
        ]);
        let policy = RetryPolicy::new(2, Some("OK: ".to_string()));

        let outcome = complete_with_retries(&provider, &request(), &policy).await;
        match outcome {
            CompletionOutcome::Answer(a) => {
                assert_eq!(a.text, "second try");
                assert_eq!(a.attempts, 2);
            }
            CompletionOutcome::NoResult { .. } => panic!("expected answer"),
        }
    }

    #[tokio::test]
    async fn zero_tries_short_circuits() {
        let provider = MockCompletionProvider::echo();
        let policy = RetryPolicy::new(0, None);

        let outcome = complete_with_retries(&provider, &request(), &policy).await;
        match outcome {
            CompletionOutcome::NoResult { attempts } => assert_eq!(attempts, 0),
            CompletionOutcome::Answer(_) => panic!("expected no result"),
        }
    }
}
