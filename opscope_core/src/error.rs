//! Error types for opscope
//!
//! Only the configuration and setup paths return errors. The executor hooks
//! (`set`, `get`, `apply_if_needed`, `maybe_probe`, `request_probe`) are
//! infallible by signature.

use thiserror::Error;

/// Errors produced while configuring opscope
#[derive(Debug, Error)]
pub enum OpscopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown operation kind: {0}")]
    UnknownOp(String),

    #[error("Signal setup failed: {0}")]
    Signal(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl OpscopeError {
    pub fn config(msg: impl Into<String>) -> Self {
        OpscopeError::Config(msg.into())
    }
}

pub type OpscopeResult<T> = Result<T, OpscopeError>;
