//! ONNX Runtime backend for SoilSense artifacts.
//!
//! Image preprocessing is always available. The session-backed models
//! ([`OnnxImageClassifier`], [`OnnxTabularModel`], [`OnnxPreprocessor`])
//! need the `onnx` feature, which links ONNX Runtime through `ort`.

pub mod error;
pub mod preprocess;

#[cfg(feature = "onnx")]
pub mod models;
#[cfg(feature = "onnx")]
pub mod session;

pub use error::{OnnxError, Result};
pub use preprocess::{argmax, image_to_tensor, ImageSpec, Layout, DEFAULT_IMAGE_SIZE};

#[cfg(feature = "onnx")]
pub use models::{OnnxImageClassifier, OnnxPreprocessor, OnnxTabularModel};
#[cfg(feature = "onnx")]
pub use session::{OnnxSession, OutputTensor};

/// Whether this build can load `.onnx` artifacts.
pub const fn is_available() -> bool {
    cfg!(feature = "onnx")
}
