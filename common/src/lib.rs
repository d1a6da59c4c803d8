//! Common types and contracts shared across the SoilSense crates.
//!
//! This crate sits at the bottom of the dependency hierarchy:
//! - Has NO dependencies on other workspace crates
//! - Defines the capability vocabulary and the artifact alias table
//! - Defines the inference contract every model backend implements
//! - Defines `PredictionResult`, the value every caller of the core receives
//!
//! # Architecture
//!
//! ```text
//! artifacts ──▶ registry ──▶ pipeline (router + fallback) ──▶ caller
//!                  ▲
//!   onnx-loader ───┤  (implement InferenceModel / FeatureTransform)
//!   python-bridge ─┘
//! ```

pub mod capability;
pub mod errors;
pub mod model;
pub mod prediction;

pub use capability::{
    capability_for, ArtifactKind, Capability, InputKind, CAPABILITY_ALIASES,
    PREPROCESSOR_STEMS,
};
pub use errors::{ArtifactLoadError, InferenceError, SchemaMismatchError};
pub use model::{
    FeatureTransform, ImageInput, InferenceModel, ModelHandle, ModelInput, ModelOutput,
    TransformHandle,
};
pub use prediction::{
    normalize_confidence, FallbackReason, PredictionResult, PredictionValue, Source,
};
