//! Unix socket listener for daemon IPC.
//!
//! The daemon accepts connections from CLI clients over a Unix domain
//! socket. The socket file is created with mode 0600 (owner only) and any
//! stale file left by a previous run is removed before binding, so a
//! restart never fails on leftover state. The file is cleaned up when the
//! listener is dropped.

use std::path::{Path, PathBuf};

use tokio::net::{UnixListener, UnixStream};

use crate::daemon::protocol::{Request, Response, read_request, write_response};
use crate::error::Result;

/// Listening Unix socket endpoint, exclusively owned by the daemon.
pub struct IpcListener {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcListener {
    /// Bind to a Unix domain socket at the given path.
    ///
    /// Creates the parent directory if needed, removes any stale socket
    /// file, binds, and restricts permissions to the owner.
    pub fn bind(socket_path: impl AsRef<Path>) -> Result<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Remove stale socket file from a previous run.
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }

        let listener = UnixListener::bind(&socket_path)?;

        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept a new incoming connection.
    pub async fn accept(&self) -> Result<IpcConnection> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(IpcConnection::new(stream))
    }

    /// Get the path to the socket file.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcListener {
    fn drop(&mut self) {
        // Best-effort cleanup on shutdown.
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// One accepted client connection.
///
/// A connection carries length-framed request/response pairs and owns no
/// state that outlives it.
pub struct IpcConnection {
    stream: UnixStream,
}

impl IpcConnection {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Receive the next request frame from the client.
    pub async fn recv_request(&mut self) -> Result<Request> {
        let request = read_request(&mut self.stream).await?;
        Ok(request)
    }

    /// Send a response frame to the client.
    pub async fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.stream, response).await?;
        Ok(())
    }
}
