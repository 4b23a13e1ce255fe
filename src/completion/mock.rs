//! Scriptable in-process completion provider.
//!
//! Two uses: the `mock` provider kind in the config (echoes prompts, so the
//! daemon can run end-to-end with no network), and scripted replies for
//! exercising the retry policy in tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{PromptdError, Result};

use super::provider::CompletionProvider;
use super::types::{Candidate, CompletionRequest, CompletionResponse};

/// One scripted reply, consumed per `complete` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return these candidate texts with finish reason "stop".
    Candidates(Vec<String>),
    /// Fail the attempt with a completion error.
    Error(String),
}

pub struct MockCompletionProvider {
    script: Mutex<Vec<MockReply>>,
    /// When the script is exhausted (or empty), echo the prompt back.
    echo_fallback: bool,
}

impl MockCompletionProvider {
    /// A provider that always echoes the prompt as its single candidate.
    pub fn echo() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            echo_fallback: true,
        }
    }

    /// A provider that replays `replies` in order, then errors.
    pub fn with_script(replies: Vec<MockReply>) -> Self {
        let mut script = replies;
        script.reverse(); // pop() from the back
        Self {
            script: Mutex::new(script),
            echo_fallback: false,
        }
    }

    fn response(candidates: Vec<String>) -> CompletionResponse {
        CompletionResponse {
            id: format!("cmpl-{}", Uuid::new_v4()),
            model: "mock".to_string(),
            created: Utc::now(),
            candidates: candidates
                .into_iter()
                .map(|text| Candidate {
                    text,
                    finish_reason: Some("stop".to_string()),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();

        match next {
            Some(MockReply::Candidates(texts)) => Ok(Self::response(texts)),
            Some(MockReply::Error(message)) => Err(PromptdError::Completion(message)),
            None if self.echo_fallback => {
                Ok(Self::response(vec![format!("echo: {}", request.prompt)]))
            }
            None => Err(PromptdError::Completion("mock script exhausted".into())),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            model: "mock".to_string(),
            max_tokens: 8,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn echo_provider_echoes() {
        let provider = MockCompletionProvider::echo();
        let response = provider.complete(&request("ping")).await.unwrap();
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].text, "echo: ping");
    }

    #[tokio::test]
    async fn scripted_provider_replays_in_order() {
        let provider = MockCompletionProvider::with_script(vec![
            MockReply::Error("down".to_string()),
            MockReply::Candidates(vec!["ok".to_string()]),
        ]);

        assert!(provider.complete(&request("x")).await.is_err());
        let second = provider.complete(&request("x")).await.unwrap();
        assert_eq!(second.candidates[0].text, "ok");
        // Script exhausted, no echo fallback.
        assert!(provider.complete(&request("x")).await.is_err());
    }
}
