//! Capability-based inference routing.
//!
//! [`InferenceRouter::predict`] is total: a missing slot, a failed load, a
//! model error, a panic inside a backend or an exceeded deadline all end in
//! the [`FallbackPolicy`] result for the same input.

use crate::fallback::FallbackPolicy;
use crate::features::{FeatureVector, FeatureVectorBuilder};
use common::{
    normalize_confidence, Capability, FallbackReason, ImageInput, InferenceError, InputKind,
    ModelHandle, ModelInput, ModelOutput, PredictionResult, PredictionValue,
};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use soilsense_artifacts::labels::placeholder;
use soilsense_registry::{ModelRegistry, ModelStatus, RegistryState};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// What the caller hands the router.
#[derive(Debug, Clone)]
pub enum RouterInput {
    Features(FeatureVector),
    Image(ImageInput),
}

impl RouterInput {
    pub fn kind(&self) -> InputKind {
        match self {
            Self::Features(_) => InputKind::Tabular,
            Self::Image(_) => InputKind::Image,
        }
    }

    /// Features the fallback rule sees for `capability`.
    fn fallback_features(&self, capability: Capability) -> FeatureVector {
        match self {
            Self::Features(fv) if fv.capability() == capability => fv.clone(),
            _ => FeatureVectorBuilder::defaults(capability),
        }
    }
}

impl From<FeatureVector> for RouterInput {
    fn from(features: FeatureVector) -> Self {
        Self::Features(features)
    }
}

impl From<ImageInput> for RouterInput {
    fn from(image: ImageInput) -> Self {
        Self::Image(image)
    }
}

/// Why a model could not answer.
enum Miss {
    NoModel,
    LoadFailed(String),
    Model(InferenceError),
}

impl Miss {
    fn reason(&self) -> FallbackReason {
        match self {
            Self::NoModel => FallbackReason::NoModel,
            Self::LoadFailed(_) => FallbackReason::LoadFailed,
            Self::Model(InferenceError::Timeout(_)) => FallbackReason::Timeout,
            Self::Model(_) => FallbackReason::ModelFailed,
        }
    }
}

/// Dispatches predictions to registry models, falling back on any miss.
#[derive(Clone)]
pub struct InferenceRouter {
    registry: Arc<ModelRegistry>,
    fallback: FallbackPolicy,
}

impl InferenceRouter {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            fallback: FallbackPolicy::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Predict `capability` from `input`. Never fails.
    ///
    /// Uses one registry snapshot for the whole call, so a concurrent
    /// reload is never observed half-way.
    pub fn predict(&self, capability: Capability, input: impl Into<RouterInput>) -> PredictionResult {
        let state = self.registry.snapshot();
        self.predict_with(&state, capability, input.into())
    }

    /// Build the feature vector from a raw record, then predict.
    pub fn predict_raw(&self, capability: Capability, raw: &Map<String, Value>) -> PredictionResult {
        self.predict(capability, FeatureVectorBuilder::build(capability, raw))
    }

    pub fn predict_image(&self, capability: Capability, image: ImageInput) -> PredictionResult {
        self.predict(capability, image)
    }

    /// [`predict`](Self::predict) bounded by `timeout`.
    ///
    /// The model runs on tokio's blocking pool. When the deadline passes the
    /// caller gets the fallback result at once; the abandoned model call is
    /// left to finish in the background.
    pub async fn predict_within(
        &self,
        capability: Capability,
        input: impl Into<RouterInput>,
        timeout: Duration,
    ) -> PredictionResult {
        let input = input.into();
        let features = input.fallback_features(capability);
        let state = self.registry.snapshot();
        let router = self.clone();

        let call = tokio::task::spawn_blocking(move || router.predict_with(&state, capability, input));
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                warn!("{} prediction task did not complete: {}", capability, join_err);
                self.fall_back(&features, Miss::Model(InferenceError::Timeout(timeout)))
            }
            Err(_) => {
                warn!("{} prediction exceeded {:?}", capability, timeout);
                self.fall_back(&features, Miss::Model(InferenceError::Timeout(timeout)))
            }
        }
    }

    fn predict_with(&self, state: &RegistryState, capability: Capability, input: RouterInput) -> PredictionResult {
        match self.invoke(state, capability, &input) {
            Ok(result) => result,
            Err(miss) => self.fall_back(&input.fallback_features(capability), miss),
        }
    }

    fn fall_back(&self, features: &FeatureVector, miss: Miss) -> PredictionResult {
        let capability = features.capability();
        match &miss {
            Miss::NoModel => debug!("{}: no model loaded, using fallback", capability),
            Miss::LoadFailed(reason) => {
                info!("{}: model failed to load ({}), using fallback", capability, reason)
            }
            Miss::Model(err) => warn!("{}: model call failed ({}), using fallback", capability, err),
        }
        self.fallback.evaluate(features).with_reason(miss.reason())
    }

    fn invoke(
        &self,
        state: &RegistryState,
        capability: Capability,
        input: &RouterInput,
    ) -> Result<PredictionResult, Miss> {
        let slot = state.get(capability).ok_or(Miss::NoModel)?;
        let handle = match &slot.status {
            ModelStatus::Ready(handle) => handle,
            ModelStatus::Failed(err) => return Err(Miss::LoadFailed(err.to_string())),
        };

        let model_input = self.model_input(state, capability, input).map_err(Miss::Model)?;
        if model_input.kind() != handle.input_kind() {
            return Err(Miss::Model(InferenceError::InputMismatch {
                expected: handle.input_kind(),
                actual: model_input.kind(),
            }));
        }

        let output = guarded(|| handle.predict(&model_input)).map_err(Miss::Model)?;
        let value = self.to_value(state, capability, output).map_err(Miss::Model)?;
        let confidence = confidence(capability, handle, &model_input);

        let tag = slot
            .path
            .file_name()
            .map(|name| format!("{}:{}", handle.backend(), name.to_string_lossy()))
            .unwrap_or_else(|| handle.backend().to_string());

        let mut result = PredictionResult::from_model(capability, value, confidence).with_tag(tag);
        if let Some(advisory) = model_advisory(capability) {
            result = result.with_advisory(advisory);
        }
        Ok(result)
    }

    /// Turn caller input into what the backend consumes.
    fn model_input(
        &self,
        state: &RegistryState,
        capability: Capability,
        input: &RouterInput,
    ) -> Result<ModelInput, InferenceError> {
        match input {
            RouterInput::Image(image) => Ok(ModelInput::Image(image.clone())),
            RouterInput::Features(fv) if fv.capability() != capability => {
                Err(InferenceError::InvalidInput(format!(
                    "features built for {} passed to {}",
                    fv.capability(),
                    capability
                )))
            }
            RouterInput::Features(fv) => {
                let raw = fv.values().to_vec();
                let Some(preprocessor) = state.preprocessor() else {
                    return Ok(ModelInput::Tabular(raw));
                };
                match guarded(|| preprocessor.transform(&raw)) {
                    Ok(transformed) => Ok(ModelInput::Tabular(transformed)),
                    Err(err) => {
                        warn!("Preprocessor failed for {} ({}); using raw features", capability, err);
                        Ok(ModelInput::Tabular(raw))
                    }
                }
            }
        }
    }

    fn to_value(
        &self,
        state: &RegistryState,
        capability: Capability,
        output: ModelOutput,
    ) -> Result<PredictionValue, InferenceError> {
        let estimator = is_estimator(capability);
        Ok(match output {
            ModelOutput::Class(idx) => match (capability.input_kind(), state.labels()) {
                (InputKind::Image, Some(labels)) => PredictionValue::Label(labels.label_for(idx)),
                _ => PredictionValue::Label(placeholder(idx)),
            },
            ModelOutput::Scalar(v) if !v.is_finite() => {
                return Err(InferenceError::InvalidOutput(format!("non-finite value {v}")))
            }
            ModelOutput::Scalar(v) if estimator => PredictionValue::Scalar(v),
            ModelOutput::Scalar(v) => PredictionValue::Label(scalar_label(v)),
            ModelOutput::Label(label) if estimator => match label.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => PredictionValue::Scalar(v),
                _ => PredictionValue::Label(label),
            },
            ModelOutput::Label(label) => PredictionValue::Label(label),
            ModelOutput::Record(map) => PredictionValue::Struct(map),
        })
    }
}

fn is_estimator(capability: Capability) -> bool {
    matches!(
        capability,
        Capability::NitrogenEstimator | Capability::PhosphorusEstimator | Capability::PotassiumEstimator
    )
}

/// Integral class codes print without a trailing `.0`.
fn scalar_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn model_advisory(capability: Capability) -> Option<&'static str> {
    match capability {
        Capability::CropRecommender => Some("Recommended based on soil and nutrient profile."),
        Capability::FertilizerRecommender => Some("Apply as per recommended dosage."),
        c if is_estimator(c) => Some("Model predicted"),
        _ => None,
    }
}

/// Measured confidence if the model offers one, else the declared nominal one.
fn confidence(capability: Capability, handle: &ModelHandle, input: &ModelInput) -> Option<f64> {
    if handle.supports_confidence() {
        match guarded(|| handle.predict_proba(input)) {
            Ok(scores) => {
                if let Some(conf) = confidence_from_scores(&scores) {
                    return Some(conf);
                }
                debug!("{}: unusable confidence scores {:?}", capability, scores);
            }
            Err(err) => debug!("{}: confidence unavailable ({})", capability, err),
        }
    }
    capability.nominal_model_confidence().and_then(normalize_confidence)
}

/// Collapse a score vector into one confidence in `[0, 1]`.
///
/// One value is clipped. A probability distribution yields its maximum.
/// Anything else is treated as logits and soft-maxed first.
pub fn confidence_from_scores(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    if scores.len() == 1 {
        return normalize_confidence(scores[0]);
    }

    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = scores.iter().sum();
    let is_distribution = scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() <= 1e-3;
    if is_distribution {
        return normalize_confidence(max);
    }

    // max(softmax) = 1 / sum(exp(s - max))
    let denom: f64 = scores.iter().map(|s| (s - max).exp()).sum();
    normalize_confidence(1.0 / denom)
}

/// Run a backend call, turning a panic into an error.
fn guarded<T>(call: impl FnOnce() -> Result<T, InferenceError>) -> Result<T, InferenceError> {
    catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(InferenceError::Panicked(panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_probabilities() {
        assert_eq!(confidence_from_scores(&[0.1, 0.7, 0.2]), Some(0.7));
        assert_eq!(confidence_from_scores(&[0.42]), Some(0.42));
        assert_eq!(confidence_from_scores(&[3.0]), Some(1.0));
        assert_eq!(confidence_from_scores(&[]), None);
        assert_eq!(confidence_from_scores(&[0.5, f64::NAN]), None);
    }

    #[test]
    fn test_confidence_from_logits() {
        let conf = confidence_from_scores(&[2.0, 0.0, -1.0]).unwrap();
        let expected = 1.0 / (1.0 + (-2.0f64).exp() + (-3.0f64).exp());
        assert!((conf - expected).abs() < 1e-12);

        // Equal logits: uniform
        let conf = confidence_from_scores(&[5.0, 5.0, 5.0, 5.0]).unwrap();
        assert!((conf - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_scalar_labels() {
        assert_eq!(scalar_label(3.0), "3");
        assert_eq!(scalar_label(-2.0), "-2");
        assert_eq!(scalar_label(2.5), "2.5");
    }

    #[test]
    fn test_panic_becomes_error() {
        let err = guarded::<()>(|| panic!("boom")).unwrap_err();
        assert!(matches!(err, InferenceError::Panicked(msg) if msg == "boom"));
    }
}
