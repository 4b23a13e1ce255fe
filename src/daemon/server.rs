//! The daemon's main loop: a readiness wait multiplexed across the prompt
//! pipe and the IPC socket.
//!
//! Setup binds both endpoints (fatal on failure, after removing any stale
//! files), then `run` parks in a `select!` with no timeout. Socket
//! connections are served on spawned tasks so a slow or panicking handler
//! can never block the loop; pipe prompts are handled inline, so a hung
//! completion call stalls the loop but not the process. That asymmetry
//! matches the original single-process design and is deliberate.

use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::completion::{
    CompletionOutcome, CompletionProvider, CompletionRequest, RetryPolicy, complete_with_retries,
    decode,
};
use crate::config::{self, Config};
use crate::daemon::listener::{IpcConnection, IpcListener};
use crate::daemon::pipe::PromptPipe;
use crate::daemon::protocol::{CompleteRequest, Operation, Request, Response, StatusBody};
use crate::error::Result;

/// State shared between the loop task and per-connection tasks.
pub struct ServerContext {
    config: Config,
    provider: Arc<dyn CompletionProvider>,
    pipe_path: String,
    socket_path: String,
    shutdown: Notify,
}

impl ServerContext {
    fn retry_policy(&self, tries: Option<u32>) -> RetryPolicy {
        RetryPolicy::new(
            tries.unwrap_or(self.config.tries),
            self.config.validation_token.clone(),
        )
    }

    fn completion_request(&self, req: &CompleteRequest) -> CompletionRequest {
        CompletionRequest {
            prompt: req.prompt.clone(),
            model: self.config.model.clone(),
            max_tokens: req.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: req.temperature.unwrap_or(self.config.temperature),
        }
    }
}

/// The daemon singleton: one pipe, one listening socket, one loop.
pub struct DaemonServer {
    listener: IpcListener,
    pipe: PromptPipe,
    ctx: Arc<ServerContext>,
}

impl DaemonServer {
    /// Bind both endpoints. Failure here is fatal: the caller exits nonzero.
    ///
    /// Binding is idempotent across restarts; stale pipe/socket files from
    /// a previous run are removed before re-creation.
    pub fn bind(config: Config, provider: Arc<dyn CompletionProvider>) -> Result<Self> {
        let pipe_path = config::pipe_path()?;
        let socket_path = config::socket_path()?;

        let pipe = PromptPipe::create(&pipe_path)?;
        let listener = IpcListener::bind(&socket_path)?;

        info!(
            pipe = %pipe_path.display(),
            socket = %socket_path.display(),
            provider = provider.provider_name(),
            "promptd endpoints bound"
        );

        let ctx = Arc::new(ServerContext {
            config,
            provider,
            pipe_path: pipe_path.display().to_string(),
            socket_path: socket_path.display().to_string(),
            shutdown: Notify::new(),
        });

        Ok(Self {
            listener,
            pipe,
            ctx,
        })
    }

    /// The main loop. Returns only on a shutdown request or signal.
    ///
    /// Transient errors (readiness-wait failure, accept failure, a failed
    /// prompt) are logged and the loop continues; nothing a single request
    /// does can terminate it.
    pub async fn run(mut self) -> Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down...");
                    break;
                }
                _ = self.ctx.shutdown.notified() => {
                    info!("Shutdown requested via IPC");
                    break;
                }

                ready = self.pipe.readable() => {
                    match ready {
                        Ok(()) => service_pipe(&mut self.pipe, &self.ctx).await,
                        Err(e) => {
                            // Transient wait failure: log and keep looping.
                            error!("Pipe readiness wait failed: {}", e);
                        }
                    }
                }

                result = self.listener.accept() => {
                    match result {
                        Ok(conn) => {
                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(conn, &ctx).await {
                                    error!("Connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }

        info!("promptd loop stopped");
        Ok(())
    }
}

/// Drain the pipe and run the blob through the completion client.
///
/// Runs inline: the loop does not service the socket while a pipe prompt is
/// in flight. A spurious wakeup drains zero bytes and is ignored entirely:
/// no dump, no completion call.
async fn service_pipe(pipe: &mut PromptPipe, ctx: &ServerContext) {
    let blob = match pipe.drain() {
        Ok(blob) => blob,
        Err(e) => {
            error!("Pipe read failed: {}", e);
            return;
        }
    };
    if blob.is_empty() {
        return;
    }

    handle_pipe_blob(blob, ctx).await;
}

/// Process one prompt blob received over the pipe.
async fn handle_pipe_blob(blob: Vec<u8>, ctx: &ServerContext) {
    info!(bytes = blob.len(), "prompt received on pipe");

    // Persist the raw blob for post-mortem inspection, overwriting the
    // previous dump. A failed write is logged but does not drop the prompt.
    match config::last_prompt_path() {
        Ok(path) => {
            if let Err(e) = std::fs::write(&path, &blob) {
                warn!(path = %path.display(), "failed to persist prompt dump: {}", e);
            }
        }
        Err(e) => warn!("no prompt dump path: {}", e),
    }

    let prompt = String::from_utf8_lossy(&blob).into_owned();
    let request = ctx.completion_request(&CompleteRequest {
        prompt,
        ..Default::default()
    });
    let policy = ctx.retry_policy(None);

    match complete_with_retries(ctx.provider.as_ref(), &request, &policy).await {
        CompletionOutcome::Answer(answer) => {
            info!(
                id = %answer.id,
                model = %answer.model,
                attempts = answer.attempts,
                finish_reason = answer.finish_reason.as_deref().unwrap_or("unknown"),
                "pipe prompt completed: {}",
                answer.text
            );
            match decode::sniff_structured(&answer.text) {
                Some(decode::StructuredPayload::Json(_)) => {
                    info!(id = %answer.id, "answer carries a JSON payload")
                }
                Some(decode::StructuredPayload::Xml(_)) => {
                    info!(id = %answer.id, "answer carries an XML payload")
                }
                None => {}
            }
        }
        CompletionOutcome::NoResult { attempts } => {
            warn!(attempts, "pipe prompt yielded no result");
        }
    }
}

/// Serve one client connection: request frames in, response frames out,
/// until the peer closes.
async fn handle_connection(mut conn: IpcConnection, ctx: &ServerContext) -> Result<()> {
    loop {
        let request = match conn.recv_request().await {
            Ok(req) => req,
            Err(_) => break, // Connection closed
        };

        let (response, should_shutdown) = dispatch_request(request, ctx).await;
        conn.send_response(&response).await?;

        if should_shutdown {
            ctx.shutdown.notify_one();
            break;
        }
    }
    Ok(())
}

/// Dispatch a request to the appropriate handler.
///
/// Returns the response and a flag indicating if the daemon should shut down.
async fn dispatch_request(request: Request, ctx: &ServerContext) -> (Response, bool) {
    let id = request.id;

    match request.op {
        Operation::Ping => {
            let response = Response::ok(
                id,
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "status": "running"
                }),
            );
            (response, false)
        }

        Operation::Status => {
            let body = StatusBody {
                pid: std::process::id(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                pipe_path: ctx.pipe_path.clone(),
                socket_path: ctx.socket_path.clone(),
                provider: ctx.provider.provider_name().to_string(),
            };
            (Response::ok(id, body), false)
        }

        Operation::Complete(req) => {
            if req.prompt.trim().is_empty() {
                return (Response::err(id, "prompt must not be empty"), false);
            }

            let completion = ctx.completion_request(&req);
            let policy = ctx.retry_policy(req.tries);
            let outcome =
                complete_with_retries(ctx.provider.as_ref(), &completion, &policy).await;
            (Response::ok(id, outcome), false)
        }

        Operation::Shutdown => {
            // Acknowledge first; the caller flips the shutdown notify.
            (Response::ok(id, "shutdown_ack"), true)
        }
    }
}
