//! SoilSense inference pipeline.
//!
//! Composes the registry with the request-side pieces:
//! - **`features`**: per-capability schemas and the feature-vector builder
//! - **`router`**: model dispatch with a total fallback path
//! - **`fallback`**: deterministic rule per capability
//! - **`advisor`**: the combined manual soil report
//!
//! # Example
//!
//! ```no_run
//! use common::Capability;
//! use soilsense_pipeline::InferenceRouter;
//! use soilsense_registry::ModelRegistry;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ModelRegistry::new());
//! let _ = registry.load(&["ml_model", "models"]);
//!
//! let router = InferenceRouter::new(registry);
//! let raw = serde_json::json!({"ph": 6.5, "temperature": 28});
//! let result = router.predict_raw(Capability::CropRecommender, raw.as_object().unwrap());
//! println!("{} ({:?})", result.value, result.source);
//! ```

pub mod advisor;
pub mod error;
pub mod fallback;
pub mod features;
pub mod router;

pub use advisor::{
    ManualInputs, NutrientReport, SoilAdvisor, SoilImageAdvice, SoilReport, SoilTypeReport,
};
pub use error::{parse_raw_input, PipelineError, Result};
pub use fallback::{crop_for_ph, fertilizer_for, FallbackPolicy};
pub use features::{known_fields, schema_for, FeatureVector, FeatureVectorBuilder, FieldSpec};
pub use router::{confidence_from_scores, InferenceRouter, RouterInput};
