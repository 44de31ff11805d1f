//! Error types for the maintenance pipeline

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Message shown to end users when a prediction request fails.
pub const GENERIC_USER_MESSAGE: &str = "Something went wrong. Please check inputs.";

/// Coarse classification of a [`PipelineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input fields
    Validation,
    /// Missing, corrupt or incompatible persisted artifacts
    Artifact,
    /// Undefined arithmetic (zero divisors, single-class metrics)
    Numeric,
    /// Filesystem and encoding failures
    Io,
}

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input data failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted artifact could not be written or read back
    #[error("Artifact error ({}): {message}", path.display())]
    Artifact { path: PathBuf, message: String },

    /// Arithmetic that has no defined result for the given data
    #[error("Numeric error in {context}: {message}")]
    Numeric {
        context: &'static str,
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing/writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn artifact(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        PipelineError::Artifact {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn numeric(context: &'static str, message: impl Into<String>) -> Self {
        PipelineError::Numeric {
            context,
            message: message.into(),
        }
    }

    /// Tag used by callers that branch on the error family
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Artifact { .. } => ErrorKind::Artifact,
            PipelineError::Numeric { .. } => ErrorKind::Numeric,
            PipelineError::Io(_) | PipelineError::Serialization(_) => ErrorKind::Io,
            PipelineError::Csv(e) => match e.kind() {
                csv::ErrorKind::Io(_) => ErrorKind::Io,
                _ => ErrorKind::Validation,
            },
        }
    }

    /// Message safe to show outside the process
    pub fn user_message(&self) -> &'static str {
        GENERIC_USER_MESSAGE
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
