//! Client for CLI-to-daemon communication over the Unix socket.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::UnixStream;

use crate::completion::CompletionOutcome;
use crate::config;
use crate::daemon::protocol::{
    CompleteRequest, Operation, Request, Response, StatusBody, read_response, write_request,
};
use crate::error::{PromptdError, Result};

/// Typed client over the daemon's framed request/response protocol.
pub struct DaemonClient {
    stream: UnixStream,
    request_id: AtomicU64,
}

impl DaemonClient {
    /// Connect to the daemon's socket at the standard path.
    pub async fn connect() -> Result<Self> {
        let socket_path = config::socket_path()?;

        let stream = UnixStream::connect(&socket_path).await.map_err(|e| {
            PromptdError::DaemonConnection(format!(
                "Failed to connect to daemon at {:?}: {}",
                socket_path, e
            ))
        })?;

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-connected stream. Used by tests that point at a
    /// non-standard socket path.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            stream,
            request_id: AtomicU64::new(1),
        }
    }

    /// Send one request and wait for its response.
    async fn request(&mut self, op: Operation) -> Result<Response> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(id, op);

        write_request(&mut self.stream, &request)
            .await
            .map_err(|e| PromptdError::DaemonProtocol(format!("Failed to send request: {}", e)))?;

        let response = read_response(&mut self.stream)
            .await
            .map_err(|e| PromptdError::DaemonProtocol(format!("Failed to read response: {}", e)))?;

        if response.id != id {
            return Err(PromptdError::DaemonProtocol(format!(
                "Response id {} does not match request id {}",
                response.id, id
            )));
        }

        Ok(response)
    }

    fn expect_ok(response: Response) -> Result<Option<serde_json::Value>> {
        if response.ok {
            Ok(response.body)
        } else {
            Err(PromptdError::Daemon(
                response.error.unwrap_or_else(|| "unknown daemon error".to_string()),
            ))
        }
    }

    /// Ping the daemon; returns its version string.
    pub async fn ping(&mut self) -> Result<String> {
        let body = Self::expect_ok(self.request(Operation::Ping).await?)?
            .ok_or_else(|| PromptdError::DaemonProtocol("ping returned no body".into()))?;
        Ok(body["version"].as_str().unwrap_or_default().to_string())
    }

    /// Fetch the daemon's runtime status.
    pub async fn status(&mut self) -> Result<StatusBody> {
        let body = Self::expect_ok(self.request(Operation::Status).await?)?
            .ok_or_else(|| PromptdError::DaemonProtocol("status returned no body".into()))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Run a prompt through the daemon's completion client.
    pub async fn complete(&mut self, req: CompleteRequest) -> Result<CompletionOutcome> {
        let body = Self::expect_ok(self.request(Operation::Complete(req)).await?)?
            .ok_or_else(|| PromptdError::DaemonProtocol("complete returned no body".into()))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Ask the daemon to shut down.
    pub async fn shutdown(&mut self) -> Result<()> {
        Self::expect_ok(self.request(Operation::Shutdown).await?)?;
        Ok(())
    }
}
