//! promptd - a prompt completion daemon with a named-pipe and socket front end.
//!
//! The daemon accepts prompt text two ways: raw blobs written to a named
//! pipe (fire-and-forget, outcome goes to the log) and framed requests over
//! a Unix domain socket (answer comes back to the caller). Either way the
//! prompt runs through a retrying completion client that talks to an
//! external completion API.
//!
//! The `prompt` binary is the CLI front end; `promptd` is the daemon.

pub mod cli;
pub mod completion;
pub mod config;
pub mod daemon;
pub mod error;

pub use error::{PromptdError, Result};
