//! Completion client: the external collaborator boundary.
//!
//! The daemon core only needs "complete a prompt with N retries and a
//! timeout" from this module. The transport (`provider`) is separated from
//! the retry/validation policy (`retry`) so the policy can be tested against
//! a scripted mock without any network.

pub mod decode;
pub mod mock;
pub mod provider;
pub mod retry;
pub mod types;

pub use mock::MockCompletionProvider;
pub use provider::{CompletionProvider, HttpCompletionProvider, build_provider};
pub use retry::{RetryPolicy, complete_with_retries};
pub use types::{Answer, Candidate, CompletionOutcome, CompletionRequest, CompletionResponse};
