//! Named pipe (FIFO) prompt intake.
//!
//! The daemon owns a FIFO that any local process can write a prompt into
//! (`echo "..." > ~/.promptd/daemon/promptd.pipe_in`). Everything available
//! at one readiness event is treated as a single complete prompt; writers
//! signal the end of a message by closing the pipe.
//!
//! The FIFO is opened in non-blocking read-write mode. Opening read-only
//! would block until the first writer appears, stalling the whole daemon
//! before it can serve its socket; holding the write end ourselves also
//! means the descriptor never reaches EOF when a writer disconnects, so a
//! single long-lived reader survives any number of writers. Read-write
//! FIFO opens are a Linux behavior, which this daemon targets.

use std::path::{Path, PathBuf};

use tokio::net::unix::pipe;
use tracing::debug;

use crate::error::{PromptdError, Result};

/// Permission mode for the FIFO file: owner writes, group/other read.
const PIPE_MODE: libc::mode_t = 0o644;

/// The daemon's FIFO endpoint, created at startup and exclusively owned.
pub struct PromptPipe {
    receiver: pipe::Receiver,
    path: PathBuf,
}

impl PromptPipe {
    /// Create (or re-create) the FIFO at `path` and open it for reading.
    ///
    /// Any stale file at the path from a previous run is unlinked first, so
    /// repeated startups succeed. Creation failure is fatal to the caller.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Remove stale pipe (or any other file) from a previous run.
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        mkfifo(&path, PIPE_MODE)?;

        let receiver = pipe::OpenOptions::new()
            .read_write(true)
            .open_receiver(&path)
            .map_err(|e| {
                PromptdError::Pipe(format!("failed to open FIFO {}: {}", path.display(), e))
            })?;

        debug!(path = %path.display(), "prompt pipe ready");
        Ok(Self { receiver, path })
    }

    /// Wait until the pipe has data pending.
    pub async fn readable(&self) -> Result<()> {
        self.receiver.readable().await?;
        Ok(())
    }

    /// Read all currently-available bytes as one prompt blob.
    ///
    /// Returns an empty vec on a spurious wakeup; the caller skips those.
    pub fn drain(&mut self) -> Result<Vec<u8>> {
        let mut blob = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            match self.receiver.try_read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => blob.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(blob)
    }

    /// Path of the FIFO file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn mkfifo(path: &Path, mode: libc::mode_t) -> Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| PromptdError::Pipe(format!("path contains NUL: {}", path.display())))?;

    // Safety: c_path is a valid NUL-terminated string for the call duration.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        return Err(PromptdError::Pipe(format!(
            "mkfifo {} failed: {}",
            path.display(),
            err
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    fn temp_pipe_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.pipe_in");
        (dir, path)
    }

    #[tokio::test]
    async fn create_makes_a_fifo() {
        use std::os::unix::fs::FileTypeExt;

        let (_dir, path) = temp_pipe_path();
        let pipe = PromptPipe::create(&path).unwrap();

        let meta = std::fs::metadata(pipe.path()).unwrap();
        assert!(meta.file_type().is_fifo());
    }

    #[tokio::test]
    async fn create_replaces_stale_file() {
        use std::os::unix::fs::FileTypeExt;

        let (_dir, path) = temp_pipe_path();
        std::fs::write(&path, b"stale regular file").unwrap();

        let _pipe = PromptPipe::create(&path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.file_type().is_fifo());
    }

    #[tokio::test]
    async fn create_twice_simulating_restart() {
        let (_dir, path) = temp_pipe_path();

        let first = PromptPipe::create(&path).unwrap();
        drop(first);
        let _second = PromptPipe::create(&path).unwrap();
    }

    #[tokio::test]
    async fn drain_on_idle_pipe_is_empty() {
        let (_dir, path) = temp_pipe_path();
        let mut pipe = PromptPipe::create(&path).unwrap();

        // No writer has connected; a drain must come back empty, not block.
        assert!(pipe.drain().unwrap().is_empty());
    }

    #[tokio::test]
    async fn written_bytes_arrive_as_one_blob() {
        let (_dir, path) = temp_pipe_path();
        let mut pipe = PromptPipe::create(&path).unwrap();

        let payload = b"explain monads in one sentence".to_vec();
        let writer_path = path.clone();
        let expected = payload.clone();

        // A blocking writer: open, write, close (EOF marks the message end).
        let writer = tokio::task::spawn_blocking(move || {
            let mut f = std::fs::OpenOptions::new()
                .write(true)
                .open(&writer_path)
                .unwrap();
            f.write_all(&expected).unwrap();
        });

        timeout(Duration::from_secs(5), pipe.readable())
            .await
            .unwrap()
            .unwrap();
        writer.await.unwrap();

        let blob = pipe.drain().unwrap();
        assert_eq!(blob, payload);
    }

    #[tokio::test]
    async fn sequential_writers_yield_sequential_blobs() {
        let (_dir, path) = temp_pipe_path();
        let mut pipe = PromptPipe::create(&path).unwrap();

        for expected in [b"first".as_slice(), b"second".as_slice()] {
            let writer_path = path.clone();
            let bytes = expected.to_vec();
            let writer = tokio::task::spawn_blocking(move || {
                let mut f = std::fs::OpenOptions::new()
                    .write(true)
                    .open(&writer_path)
                    .unwrap();
                f.write_all(&bytes).unwrap();
            });

            timeout(Duration::from_secs(5), pipe.readable())
                .await
                .unwrap()
                .unwrap();
            writer.await.unwrap();

            assert_eq!(pipe.drain().unwrap(), expected);
        }
    }
}
