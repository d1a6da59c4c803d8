//! Combined manual soil report.

use crate::fallback::DEFICIENCY_THRESHOLD;
use crate::features::{resolve, RawFields, REPORT_SCHEMA};
use crate::router::InferenceRouter;
use common::{Capability, ImageInput, PredictionResult};
use serde::Serialize;
use serde_json::{Map, Value};
use soilsense_agronomy::{suitability, Recommendation, Season, SeasonalRecommendationEngine, Suitability};
use std::collections::BTreeMap;

/// Soil type used when neither an explicit value nor an image is given.
pub const UNKNOWN_SOIL: &str = "Unknown";

/// The numeric and text fields the report was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualInputs {
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub soil_type: Option<String>,
    pub crop_type: Option<String>,
    pub fertilizer_name: Option<String>,
}

impl ManualInputs {
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        let fields = RawFields::new(raw);
        let mut numbers = REPORT_SCHEMA.iter().map(|spec| resolve(&fields, spec).0);
        let mut next = || numbers.next().unwrap_or_default();
        Self {
            temperature: next(),
            humidity: next(),
            soil_moisture: next(),
            ph: next(),
            nitrogen: next(),
            phosphorus: next(),
            potassium: next(),
            soil_type: fields.text("soil_type"),
            crop_type: fields.text("crop_type"),
            fertilizer_name: fields.text("fertilizer_name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientReport {
    pub nitrogen: PredictionResult,
    pub phosphorus: PredictionResult,
    pub potassium: PredictionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilTypeReport {
    pub value: String,
    pub confidence: Option<f64>,
    /// Where the value came from: `input`, `model`, `fallback` or `unknown`
    pub origin: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilReport {
    pub inputs: ManualInputs,
    pub recommended_crop: PredictionResult,
    pub fertilizer_suggestion: PredictionResult,
    pub nutrients: NutrientReport,
    pub soil_type: SoilTypeReport,
    pub confidence_scores: BTreeMap<&'static str, Option<f64>>,
    pub other_suggestions: Vec<String>,
    /// Which capabilities are currently backed by a loaded model
    pub model_used: BTreeMap<Capability, bool>,
    pub user_crop: Suitability,
}

/// A classified soil photo and the crops that suit it this season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilImageAdvice {
    pub soil_type: SoilTypeReport,
    pub recommendation: Recommendation,
}

/// Runs every tabular capability over one manual reading.
#[derive(Clone)]
pub struct SoilAdvisor {
    router: InferenceRouter,
}

impl SoilAdvisor {
    pub fn new(router: InferenceRouter) -> Self {
        Self { router }
    }

    pub fn assess(&self, raw: &Map<String, Value>) -> SoilReport {
        self.assess_with_image(raw, None)
    }

    /// Like [`assess`](Self::assess); a soil photo is classified when the
    /// input names no soil type.
    pub fn assess_with_image(&self, raw: &Map<String, Value>, image: Option<ImageInput>) -> SoilReport {
        let inputs = ManualInputs::from_raw(raw);
        let availability = self.router.registry().snapshot().model_availability();

        let crop = self.router.predict_raw(Capability::CropRecommender, raw);
        let fertilizer = self.router.predict_raw(Capability::FertilizerRecommender, raw);
        let nutrients = NutrientReport {
            nitrogen: self.router.predict_raw(Capability::NitrogenEstimator, raw),
            phosphorus: self.router.predict_raw(Capability::PhosphorusEstimator, raw),
            potassium: self.router.predict_raw(Capability::PotassiumEstimator, raw),
        };
        let soil_type = self.soil_type(&inputs, image);

        let confidence_scores = BTreeMap::from([
            ("crop", crop.confidence),
            ("fertilizer", fertilizer.confidence),
            ("soil", soil_type.confidence),
        ]);

        let mut other_suggestions = Vec::new();
        if nutrients.nitrogen.value.as_scalar().unwrap_or(0.0) < DEFICIENCY_THRESHOLD {
            other_suggestions.push("Consider adding Nitrogen rich fertilizer (e.g., Urea)".to_string());
        }
        other_suggestions.push("Monitor soil pH every 3 months".to_string());

        let user_crop = suitability(
            inputs.crop_type.as_deref().unwrap_or_default(),
            inputs.ph,
            inputs.soil_moisture,
        );

        log::debug!(
            "Manual report: crop={} ({:?}), fertilizer={} ({:?}), soil={}",
            crop.value,
            crop.source,
            fertilizer.value,
            fertilizer.source,
            soil_type.value
        );

        SoilReport {
            inputs,
            recommended_crop: crop,
            fertilizer_suggestion: fertilizer,
            nutrients,
            soil_type,
            confidence_scores,
            other_suggestions,
            model_used: availability,
            user_crop,
        }
    }

    /// Classify a soil photo and recommend crops for the predicted soil type.
    ///
    /// Without a soil model the fallback label is used, so a recommendation
    /// is always produced.
    pub fn classify_soil(&self, image: ImageInput, season: Season) -> SoilImageAdvice {
        let soil_type = self.image_soil_type(image);
        let recommendation = SeasonalRecommendationEngine::new().recommend(&soil_type.value, season);
        log::debug!(
            "Soil image classified as {} ({}), {} crops for {}",
            soil_type.value,
            soil_type.origin,
            recommendation.crops.len(),
            season
        );
        SoilImageAdvice {
            soil_type,
            recommendation,
        }
    }

    fn image_soil_type(&self, image: ImageInput) -> SoilTypeReport {
        let result = self.router.predict_image(Capability::SoilImageClassifier, image);
        SoilTypeReport {
            value: result.value.to_string(),
            confidence: result.confidence,
            origin: if result.is_fallback() { "fallback" } else { "model" },
        }
    }

    fn soil_type(&self, inputs: &ManualInputs, image: Option<ImageInput>) -> SoilTypeReport {
        if let Some(explicit) = &inputs.soil_type {
            return SoilTypeReport {
                value: explicit.clone(),
                confidence: None,
                origin: "input",
            };
        }
        match image {
            Some(image) => self.image_soil_type(image),
            None => SoilTypeReport {
                value: UNKNOWN_SOIL.to_string(),
                confidence: None,
                origin: "unknown",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_manual_inputs_defaults_and_text() {
        let inputs = ManualInputs::from_raw(&obj(json!({
            "ph": "6.2",
            "Moisture": 22,
            "soil_type": "  Clay ",
            "crop_type": "",
        })));
        assert_eq!(inputs.ph, 6.2);
        assert_eq!(inputs.soil_moisture, 22.0);
        assert_eq!(inputs.temperature, 25.0);
        assert_eq!(inputs.humidity, 50.0);
        assert_eq!(inputs.nitrogen, 10.0);
        assert_eq!(inputs.soil_type.as_deref(), Some("Clay"));
        assert_eq!(inputs.crop_type, None);
    }
}
