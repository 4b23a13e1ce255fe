//! CLI command implementations for the `prompt` binary.

pub mod args;
pub mod ask;
pub mod daemon;
pub mod send;
