//! Error types for the exporter

use thiserror::Error;

/// Exporter-wide error type
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("I/O error ({path}): {message}")]
    Io { path: String, message: String },

    #[error("An export is already running")]
    AlreadyRunning,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExportError {
    pub fn network(msg: impl Into<String>) -> Self {
        ExportError::Network(msg.into())
    }

    pub fn empty_result(msg: impl Into<String>) -> Self {
        ExportError::EmptyResult(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        ExportError::Parse(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        ExportError::Format(msg.into())
    }

    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        ExportError::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ExportError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ExportError::Internal(msg.into())
    }
}

/// Result type alias for exporter operations
pub type ExportResult<T> = Result<T, ExportError>;
