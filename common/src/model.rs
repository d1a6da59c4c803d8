//! Inference contract implemented by every model backend.
//!
//! The registry never introspects a model beyond this trait. Backends that
//! expose class probabilities set `supports_confidence`; the router only
//! calls `predict_proba` when that flag is set.

use crate::capability::InputKind;
use crate::errors::InferenceError;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Encoded image bytes (PNG/JPEG) handed to an image classifier.
#[derive(Clone)]
pub struct ImageInput {
    bytes: Arc<[u8]>,
    source: Option<PathBuf>,
}

impl ImageInput {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            source: None,
        }
    }

    /// Read an image file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(Self {
            bytes: bytes.into(),
            source: Some(path.to_path_buf()),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Where the bytes came from, if they were read from a file.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("len", &self.bytes.len())
            .field("source", &self.source)
            .finish()
    }
}

/// What a backend receives.
#[derive(Debug, Clone)]
pub enum ModelInput {
    /// One ordered numeric row (after optional preprocessing)
    Tabular(Vec<f64>),
    /// One encoded image
    Image(ImageInput),
}

impl ModelInput {
    pub fn kind(&self) -> InputKind {
        match self {
            Self::Tabular(_) => InputKind::Tabular,
            Self::Image(_) => InputKind::Image,
        }
    }
}

/// What a backend returns from `predict`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Class index, mapped to a label by the registry's label list
    Class(usize),
    /// Label the model produced directly
    Label(String),
    /// Regression output
    Scalar(f64),
    /// Structured output (e.g. a dict returned by a Python model)
    Record(Map<String, Value>),
}

/// Polymorphic inference interface, one implementation per model kind.
///
/// Implementations must be logically immutable once loaded: the router
/// invokes them concurrently from multiple callers.
pub trait InferenceModel: Send + Sync {
    /// Backend name for introspection ("onnx", "keras", "sklearn", ...).
    fn backend(&self) -> &str;

    /// Input kind this model accepts.
    fn input_kind(&self) -> InputKind;

    /// Whether `predict_proba` yields a usable confidence signal.
    fn supports_confidence(&self) -> bool {
        false
    }

    /// Run the model.
    fn predict(&self, input: &ModelInput) -> Result<ModelOutput, InferenceError>;

    /// Class probabilities (classifiers) or a single measured confidence
    /// (regressors). Only called when `supports_confidence` is true.
    fn predict_proba(&self, _input: &ModelInput) -> Result<Vec<f64>, InferenceError> {
        Err(InferenceError::Unsupported(format!(
            "{} model exposes no confidence signal",
            self.backend()
        )))
    }
}

/// Feature preprocessor (scaler / encoder) applied to tabular rows.
pub trait FeatureTransform: Send + Sync {
    fn backend(&self) -> &str;

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

/// Shared handle to a loaded model.
pub type ModelHandle = Arc<dyn InferenceModel>;

/// Shared handle to a loaded preprocessor.
pub type TransformHandle = Arc<dyn FeatureTransform>;
