/// Error taxonomy of the orchestration core.
///
/// None of these is fatal to the process:
/// - `ArtifactLoadError`: one artifact, recorded against its slot and skipped
/// - `InferenceError`: one model call, caught by the router, triggers fallback
/// - `SchemaMismatchError`: one input field, replaced by its declared default
use crate::capability::{ArtifactKind, InputKind};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ArtifactLoadError {
    #[error("No {backend} backend compiled in for {kind} artifact {path:?}")]
    BackendUnavailable {
        backend: &'static str,
        kind: ArtifactKind,
        path: PathBuf,
    },

    #[error("Unsupported artifact format: {path:?}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read artifact {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Malformed artifact {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Backend failed to load {path:?}: {reason}")]
    Backend { path: PathBuf, reason: String },
}

impl ArtifactLoadError {
    pub fn unreadable(path: impl Into<PathBuf>, err: impl ToString) -> Self {
        Self::Unreadable {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(path: impl Into<PathBuf>, err: impl ToString) -> Self {
        Self::Backend {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum InferenceError {
    #[error("Input mismatch: model expects {expected} input, got {actual}")]
    InputMismatch {
        expected: InputKind,
        actual: InputKind,
    },

    #[error("Operation not supported by this model: {0}")]
    Unsupported(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model returned unusable output: {0}")]
    InvalidOutput(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Model call panicked: {0}")]
    Panicked(String),

    #[error("Model call exceeded {0:?}")]
    Timeout(Duration),
}

/// A raw input value that could not be coerced to a number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Field '{field}' is not numeric ({raw}); using default {default}")]
pub struct SchemaMismatchError {
    pub field: &'static str,
    pub raw: String,
    pub default: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InferenceError::InputMismatch {
            expected: InputKind::Image,
            actual: InputKind::Tabular,
        };
        assert_eq!(
            err.to_string(),
            "Input mismatch: model expects image input, got tabular"
        );

        let err = ArtifactLoadError::malformed("labels.json", "not a list");
        assert_eq!(
            err.to_string(),
            "Malformed artifact \"labels.json\": not a list"
        );
    }
}
