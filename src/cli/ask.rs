//! `prompt ask`: socket round-trip through the daemon's completion client.

use crate::completion::CompletionOutcome;
use crate::daemon::auto_start::ensure_daemon;
use crate::daemon::protocol::CompleteRequest;
use crate::error::{PromptdError, Result};

pub async fn ask(
    text: String,
    tries: Option<u32>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
) -> Result<()> {
    if text.trim().is_empty() {
        return Err(PromptdError::InvalidArgument("prompt must not be empty".into()));
    }

    let mut client = ensure_daemon().await?;

    let outcome = client
        .complete(CompleteRequest {
            prompt: text,
            tries,
            max_tokens,
            temperature,
        })
        .await?;

    match outcome {
        CompletionOutcome::Answer(answer) => {
            println!("{}", answer.text);
            eprintln!(
                "[{} | {} | attempt {} | {}]",
                answer.id,
                answer.model,
                answer.attempts,
                answer.finish_reason.as_deref().unwrap_or("unknown")
            );
            Ok(())
        }
        CompletionOutcome::NoResult { attempts } => Err(PromptdError::Completion(format!(
            "no valid candidate after {} attempts",
            attempts
        ))),
    }
}
