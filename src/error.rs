use thiserror::Error;

/// Process exit codes used by the CLI and the daemon binary.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const INTERNAL: i32 = 1;
    pub const USER_ERROR: i32 = 2;
    pub const UNAVAILABLE: i32 = 3;
}

#[derive(Error, Debug)]
pub enum PromptdError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Daemon lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Pipe error: {0}")]
    Pipe(String),

    #[error("Failed to connect to daemon: {0}")]
    DaemonConnection(String),

    #[error("Daemon protocol error: {0}")]
    DaemonProtocol(String),

    #[error("Daemon error: {0}")]
    Daemon(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PromptdError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PromptdError::InvalidArgument(_) => exit_codes::USER_ERROR,

            PromptdError::DaemonConnection(_) => exit_codes::UNAVAILABLE,

            PromptdError::Config(_)
            | PromptdError::Lifecycle(_)
            | PromptdError::Pipe(_)
            | PromptdError::DaemonProtocol(_)
            | PromptdError::Daemon(_)
            | PromptdError::Completion(_)
            | PromptdError::Http(_)
            | PromptdError::Io(_)
            | PromptdError::Json(_)
            | PromptdError::Toml(_) => exit_codes::INTERNAL,
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptdError>;
