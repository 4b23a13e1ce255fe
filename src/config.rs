//! Configuration and well-known filesystem paths.
//!
//! All daemon state lives under a single root directory, `$PROMPTD_HOME` if
//! set and `~/.promptd` otherwise. The config file at `<root>/config.toml`
//! holds the completion settings; every other path in here is derived from
//! the root and is not user-configurable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PromptdError, Result};

/// Base name used for the pipe and socket endpoints.
pub const DAEMON_NAME: &str = "promptd";

/// Get the promptd root directory (`$PROMPTD_HOME` or `~/.promptd`).
pub fn home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("PROMPTD_HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(".promptd"))
        .ok_or_else(|| PromptdError::Config("Could not determine home directory".into()))
}

/// Get the path to the config file (`<root>/config.toml`).
pub fn config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join("config.toml"))
}

/// Get the daemon runtime directory (`<root>/daemon`).
pub fn daemon_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join("daemon"))
}

/// Get the named pipe path (`<root>/daemon/promptd.pipe_in`).
pub fn pipe_path() -> Result<PathBuf> {
    Ok(daemon_dir()?.join(format!("{DAEMON_NAME}.pipe_in")))
}

/// Get the daemon socket path (`<root>/daemon/promptd.sock`).
pub fn socket_path() -> Result<PathBuf> {
    Ok(daemon_dir()?.join(format!("{DAEMON_NAME}.sock")))
}

/// Get the daemon PID file path (`<root>/daemon/promptd.pid`).
pub fn pid_path() -> Result<PathBuf> {
    Ok(daemon_dir()?.join(format!("{DAEMON_NAME}.pid")))
}

/// Get the daemon stdout log path (`<root>/daemon/promptd.out.log`).
pub fn stdout_log_path() -> Result<PathBuf> {
    Ok(daemon_dir()?.join(format!("{DAEMON_NAME}.out.log")))
}

/// Get the daemon stderr log path (`<root>/daemon/promptd.err.log`).
pub fn stderr_log_path() -> Result<PathBuf> {
    Ok(daemon_dir()?.join(format!("{DAEMON_NAME}.err.log")))
}

/// Get the last-received-prompt debug dump path (`<root>/daemon/last_prompt.txt`).
///
/// Overwritten on every pipe prompt; kept for post-mortem inspection.
pub fn last_prompt_path() -> Result<PathBuf> {
    Ok(daemon_dir()?.join("last_prompt.txt"))
}

/// Which completion backend the daemon talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// HTTP completion API (OpenAI-style `/completions`).
    Http,
    /// In-process mock provider; used by tests and offline smoke runs.
    Mock,
}

/// Completion settings loaded from `<root>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion backend selection.
    pub provider: ProviderKind,
    /// Base URL of the completion API.
    pub endpoint: String,
    /// Model name submitted with every request.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Retry budget for a single prompt.
    pub tries: u32,
    /// Token limit submitted with every request.
    pub max_tokens: u32,
    /// Sampling temperature submitted with every request.
    pub temperature: f32,
    /// Optional prefix a candidate must start with to be accepted.
    /// The prefix is stripped from the stored response.
    pub validation_token: Option<String>,
    /// Per-attempt HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Http,
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            tries: 3,
            max_tokens: 256,
            temperature: 0.7,
            validation_token: None,
            request_timeout_secs: 60,
        }
    }
}

/// Load the configuration from `<root>/config.toml`.
/// Returns the default config if the file doesn't exist.
pub fn load() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| PromptdError::Config(format!("Failed to parse config: {}", e)))
}
