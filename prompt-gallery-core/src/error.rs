//! Gallery error types with clear, actionable messages

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the gallery core
///
/// Parsing and metadata extraction never produce these; they degrade to
/// empty results instead.
#[derive(Error, Debug)]
pub enum GalleryError {
    /// A manifest, document or image is absent from its store
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Network or storage failure while talking to a collaborator
    #[error("Transport failure while {action}: {message}")]
    Transport { action: String, message: String },

    /// Persisted state or a fetched payload could not be interpreted
    #[error("Malformed {what}: {message}")]
    MalformedInput { what: String, message: String },

    /// An operation was asked to run without what it needs
    #[error("{0}")]
    Precondition(String),

    /// A resource never became visible in its store
    #[error("{what} not found after {attempts} attempts ({delay:?} apart)")]
    Timeout {
        what: String,
        attempts: u32,
        delay: Duration,
    },

    /// Filename or subfolder tried to escape the data root
    #[error("Invalid file path: {path}")]
    InvalidPath { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GalleryError>;

impl GalleryError {
    pub fn not_found(what: impl Into<String>) -> Self {
        GalleryError::NotFound { what: what.into() }
    }

    pub fn transport(action: impl Into<String>, message: impl ToString) -> Self {
        GalleryError::Transport {
            action: action.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(what: impl Into<String>, message: impl ToString) -> Self {
        GalleryError::MalformedInput {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Whether this is the distinguishable "absent" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, GalleryError::NotFound { .. })
    }
}
