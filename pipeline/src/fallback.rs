//! Deterministic, model-free estimates for every capability.
//!
//! Confidences are fixed and sit below what a loaded model reports, so a
//! low confidence marks degraded mode.

use crate::features::FeatureVector;
use common::{Capability, PredictionResult, PredictionValue};

pub const CROP_CONFIDENCE: f64 = 0.65;
pub const FERTILIZER_CONFIDENCE: f64 = 0.6;
pub const NUTRIENT_CONFIDENCE: f64 = 0.5;
pub const SOIL_IMAGE_CONFIDENCE: f64 = 0.6;
pub const DISEASE_CONFIDENCE: f64 = 0.5;

/// Soil type assumed when no soil image model is available.
pub const DEFAULT_SOIL_LABEL: &str = "Loamy";

/// Advisory attached to nutrient estimates not produced by a model.
pub const HEURISTIC_ADVISORY: &str = "Heuristic estimate";

/// Nutrient level below which a nutrient counts as deficient.
pub const DEFICIENCY_THRESHOLD: f64 = 10.0;

/// Rule-based estimator consulted when no model can answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy;

impl FallbackPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Estimate for `features.capability()`. Total over all inputs.
    ///
    /// The result carries reason `NoModel`; the router overrides it when it
    /// fell through for another reason.
    pub fn evaluate(&self, features: &FeatureVector) -> PredictionResult {
        let capability = features.capability();
        let ph = features.get("ph").unwrap_or(7.0);

        match capability {
            Capability::CropRecommender => PredictionResult::from_fallback(
                capability,
                PredictionValue::Label(crop_for_ph(ph).to_string()),
                CROP_CONFIDENCE,
                "ph-band",
            )
            .with_advisory("Apply lime if pH low"),

            Capability::FertilizerRecommender => {
                let nutrient = |name| features.get(name).unwrap_or(DEFICIENCY_THRESHOLD);
                let suggestion = fertilizer_for(
                    nutrient("nitrogen"),
                    nutrient("phosphorus"),
                    nutrient("potassium"),
                );
                PredictionResult::from_fallback(
                    capability,
                    PredictionValue::Label(suggestion.to_string()),
                    FERTILIZER_CONFIDENCE,
                    "npk-threshold",
                )
                .with_advisory("Rule-based suggestion.")
            }

            Capability::NitrogenEstimator => PredictionResult::from_fallback(
                capability,
                PredictionValue::Scalar(10.0 + (ph - 7.0) * 0.5),
                NUTRIENT_CONFIDENCE,
                "ph-linear",
            )
            .with_advisory(HEURISTIC_ADVISORY),

            Capability::PhosphorusEstimator => PredictionResult::from_fallback(
                capability,
                PredictionValue::Scalar(8.0),
                NUTRIENT_CONFIDENCE,
                "constant",
            )
            .with_advisory(HEURISTIC_ADVISORY),

            Capability::PotassiumEstimator => PredictionResult::from_fallback(
                capability,
                PredictionValue::Scalar(9.0),
                NUTRIENT_CONFIDENCE,
                "constant",
            )
            .with_advisory(HEURISTIC_ADVISORY),

            Capability::SoilImageClassifier => PredictionResult::from_fallback(
                capability,
                PredictionValue::Label(DEFAULT_SOIL_LABEL.to_string()),
                SOIL_IMAGE_CONFIDENCE,
                "default-soil",
            ),

            Capability::DiseaseClassifier => PredictionResult::from_fallback(
                capability,
                PredictionValue::Label("Undetermined".to_string()),
                DISEASE_CONFIDENCE,
                "no-disease-model",
            ),
        }
    }
}

/// pH band crop choice.
pub fn crop_for_ph(ph: f64) -> &'static str {
    if ph < 6.0 {
        "Soybean"
    } else if ph < 7.0 {
        "Wheat"
    } else {
        // NaN lands here as well
        "Cotton"
    }
}

/// First deficient nutrient, checked N then P then K.
pub fn fertilizer_for(nitrogen: f64, phosphorus: f64, potassium: f64) -> &'static str {
    if nitrogen < DEFICIENCY_THRESHOLD {
        "Urea (Nitrogen rich)"
    } else if phosphorus < DEFICIENCY_THRESHOLD {
        "DAP (Phosphorus rich)"
    } else if potassium < DEFICIENCY_THRESHOLD {
        "Muriate of Potash (Potassium rich)"
    } else {
        "Balanced NPK"
    }
}
