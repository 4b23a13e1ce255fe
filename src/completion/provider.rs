//! Completion providers: the transport half of the completion client.
//!
//! `CompletionProvider` is the seam the daemon core depends on; the HTTP
//! implementation speaks an OpenAI-style `/completions` endpoint. Candidate
//! selection, retries, and validation live in [`crate::completion::retry`],
//! not here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, ProviderKind};
use crate::error::{PromptdError, Result};

use super::mock::MockCompletionProvider;
use super::types::{Candidate, CompletionRequest, CompletionResponse};

/// A synchronous round-trip to a completion backend.
///
/// One call is one attempt; implementations must not retry internally.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    fn provider_name(&self) -> &str;
}

/// Build the provider selected by the config.
pub fn build_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider {
        ProviderKind::Http => {
            let api_key = std::env::var(&config.api_key_env).ok();
            let provider = HttpCompletionProvider::new(
                config.endpoint.clone(),
                api_key,
                Duration::from_secs(config.request_timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Mock => Ok(Arc::new(MockCompletionProvider::echo())),
    }
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Wire format of the `/completions` request body.
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

/// Wire format of the `/completions` response body.
#[derive(Debug, Deserialize)]
struct WireResponse {
    id: String,
    model: String,
    /// Unix timestamp.
    created: i64,
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    text: String,
    finish_reason: Option<String>,
}

/// Completion provider backed by an OpenAI-style HTTP API.
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpCompletionProvider {
    /// Create a provider for the given base URL.
    ///
    /// `endpoint` is the API base (e.g. `https://api.openai.com/v1`); the
    /// `/completions` path is appended per request. `api_key` is sent as a
    /// bearer token when present.
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/completions", self.endpoint);

        let body = WireRequest {
            model: &request.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PromptdError::Completion(format!(
                "completion API returned {}: {}",
                status,
                text.trim()
            )));
        }

        let wire: WireResponse = response.json().await?;

        let created = Utc
            .timestamp_opt(wire.created, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(CompletionResponse {
            id: wire.id,
            model: wire.model,
            created,
            candidates: wire
                .choices
                .into_iter()
                .map(|c| Candidate {
                    text: c.text,
                    finish_reason: c.finish_reason,
                })
                .collect(),
        })
    }

    fn provider_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            prompt: "say hi".to_string(),
            model: "test-model".to_string(),
            max_tokens: 16,
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn http_provider_parses_choices() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "cmpl-xyz",
                    "model": "test-model",
                    "created": 1700000000,
                    "choices": [
                        {"text": "hi there", "finish_reason": "stop"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let provider =
            HttpCompletionProvider::new(server.url(), None, Duration::from_secs(5)).unwrap();
        let response = provider.complete(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.id, "cmpl-xyz");
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].text, "hi there");
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn http_provider_reports_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/completions")
            .with_status(500)
            .with_body("upstream on fire")
            .create_async()
            .await;

        let provider =
            HttpCompletionProvider::new(server.url(), None, Duration::from_secs(5)).unwrap();
        let err = provider.complete(&request()).await.unwrap_err();

        match err {
            PromptdError::Completion(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("upstream on fire"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn http_provider_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/completions")
            .match_header("authorization", "Bearer sekret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"cmpl-1","model":"m","created":0,"choices":[]}"#)
            .create_async()
            .await;

        let provider = HttpCompletionProvider::new(
            server.url(),
            Some("sekret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        let response = provider.complete(&request()).await.unwrap();

        mock.assert_async().await;
        assert!(response.candidates.is_empty());
    }
}
