//! The promptd daemon core: lifecycle, endpoints, main loop, and the IPC
//! client used by the CLI.

pub mod auto_start;
pub mod client;
pub mod lifecycle;
pub mod listener;
pub mod pipe;
pub mod protocol;
pub mod server;

pub use auto_start::{daemon_pid, ensure_daemon, is_daemon_running};
pub use client::DaemonClient;
pub use listener::{IpcConnection, IpcListener};
pub use pipe::PromptPipe;
pub use server::DaemonServer;
