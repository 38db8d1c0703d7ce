//! Error handling module for the Slack workflow.
//!
//! Provides a single error type covering the remote API, persistence and lookups.

use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const HTTP_STATUS: &str = "HTTP_STATUS";
    pub const REMOTE_API_ERROR: &str = "REMOTE_API_ERROR";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const MISSING_TOKEN: &str = "MISSING_TOKEN";
    pub const TASK_ERROR: &str = "TASK_ERROR";
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Connection, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(String),
    /// Response status outside the 2xx/3xx range
    #[error("HTTP error: {0}")]
    HttpStatus(String),
    /// Well-formed envelope with `ok: false`
    #[error("{method} failed: {message}")]
    RemoteApi { method: String, message: String },
    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
    /// Snapshot, config or emoji file could not be written
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Lookup miss where the caller needs a value
    #[error("not found: {0}")]
    NotFound(String),
    /// A remote operation was requested before a token was stored
    #[error("no API token configured")]
    MissingToken,
    /// A spawned fetch task panicked or was cancelled
    #[error("task error: {0}")]
    Task(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Transport(_) => codes::TRANSPORT_ERROR,
            AppError::HttpStatus(_) => codes::HTTP_STATUS,
            AppError::RemoteApi { .. } => codes::REMOTE_API_ERROR,
            AppError::Decode(_) => codes::DECODE_ERROR,
            AppError::Persistence(_) => codes::PERSISTENCE_ERROR,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::MissingToken => codes::MISSING_TOKEN,
            AppError::Task(_) => codes::TASK_ERROR,
        }
    }

    /// Get the error message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            AppError::Transport(msg) => msg.clone(),
            AppError::HttpStatus(msg) => msg.clone(),
            AppError::RemoteApi { message, .. } => message.clone(),
            AppError::Decode(msg) => msg.clone(),
            AppError::Persistence(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::MissingToken => "no API token configured".to_string(),
            AppError::Task(msg) => msg.clone(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Transport error: {:?}", err);
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Persistence(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Task error: {:?}", err);
        AppError::Task(err.to_string())
    }
}

/// Result alias used across the crate.
pub type AppResult<T> = Result<T, AppError>;
