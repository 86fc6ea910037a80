//! Error types shared across ShortMaker crates.

use std::path::PathBuf;

/// Top-level error type for ShortMaker operations.
#[derive(Debug, thiserror::Error)]
pub enum ShortsError {
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Invalid clip range: {message}")]
    InvalidRange { message: String },

    #[error("Hardware encode failed: {message}")]
    HardwareEncodeFailure { message: String },

    #[error("Software encode failed: {message}")]
    SoftwareEncodeFailure { message: String },

    #[error("Render produced an empty output file: {path}")]
    EmptyOutputArtifact { path: PathBuf },

    #[error("Filter graph error: {message}")]
    Graph { message: String },

    #[error("Process error: {message}")]
    Process { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ShortsError.
pub type ShortsResult<T> = Result<T, ShortsError>;

impl ShortsError {
    pub fn invalid_timestamp(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange {
            message: msg.into(),
        }
    }

    pub fn hardware_encode(msg: impl Into<String>) -> Self {
        Self::HardwareEncodeFailure {
            message: msg.into(),
        }
    }

    pub fn software_encode(msg: impl Into<String>) -> Self {
        Self::SoftwareEncodeFailure {
            message: msg.into(),
        }
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph {
            message: msg.into(),
        }
    }

    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
