//! Error types shared across Rampcut crates.

use std::path::PathBuf;

/// Top-level error type for Rampcut operations.
#[derive(Debug, thiserror::Error)]
pub enum RampcutError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Delivery error: {message}")]
    Delivery { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("An export is already in progress")]
    Busy,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RampcutError.
pub type RampcutResult<T> = Result<T, RampcutError>;

impl RampcutError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive {
            message: msg.into(),
        }
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Input errors are rejected before any execution path starts and are
    /// never retried on another path.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::FileNotFound { .. })
    }
}
