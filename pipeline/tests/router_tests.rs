//! Router behaviour against hand-built registry states.

use common::{
    ArtifactLoadError, Capability, FallbackReason, FeatureTransform, ImageInput, InferenceError,
    InferenceModel, InputKind, ModelInput, ModelOutput, PredictionValue, Source,
};
use serde_json::{json, Map, Value};
use soilsense_artifacts::LabelList;
use soilsense_pipeline::{FeatureVectorBuilder, InferenceRouter};
use soilsense_registry::{ModelRegistry, RegistryState, StateBuilder};
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Behaviour {
    Answer(ModelOutput),
    Fail,
    Panic,
    Sleep(Duration, ModelOutput),
}

struct ScriptedModel {
    input: InputKind,
    behaviour: Behaviour,
    proba: Option<Vec<f64>>,
    seen: Mutex<Vec<Vec<f64>>>,
}

impl ScriptedModel {
    fn new(input: InputKind, behaviour: Behaviour) -> Self {
        Self {
            input,
            behaviour,
            proba: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn with_proba(mut self, proba: Vec<f64>) -> Self {
        self.proba = Some(proba);
        self
    }
}

impl InferenceModel for ScriptedModel {
    fn backend(&self) -> &str {
        "scripted"
    }

    fn input_kind(&self) -> InputKind {
        self.input
    }

    fn supports_confidence(&self) -> bool {
        self.proba.is_some()
    }

    fn predict(&self, input: &ModelInput) -> Result<ModelOutput, InferenceError> {
        if let ModelInput::Tabular(row) = input {
            self.seen.lock().unwrap().push(row.clone());
        }
        match &self.behaviour {
            Behaviour::Answer(out) => Ok(out.clone()),
            Behaviour::Fail => Err(InferenceError::Backend("scripted failure".into())),
            Behaviour::Panic => panic!("scripted panic"),
            Behaviour::Sleep(delay, out) => {
                std::thread::sleep(*delay);
                Ok(out.clone())
            }
        }
    }

    fn predict_proba(&self, _input: &ModelInput) -> Result<Vec<f64>, InferenceError> {
        self.proba
            .clone()
            .ok_or_else(|| InferenceError::Unsupported("no proba".into()))
    }
}

struct Doubler {
    fail: bool,
}

impl FeatureTransform for Doubler {
    fn backend(&self) -> &str {
        "scripted"
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if self.fail {
            return Err(InferenceError::Backend("cannot transform".into()));
        }
        Ok(row.iter().map(|v| v * 2.0).collect())
    }
}

fn builder() -> StateBuilder {
    RegistryState::builder(1, vec!["models".into()])
}

fn router(state: RegistryState) -> InferenceRouter {
    let _ = env_logger::builder().is_test(true).try_init();
    InferenceRouter::new(Arc::new(ModelRegistry::from_state(state)))
}

fn raw(value: Value) -> Map<String, Value> {
    serde_json::from_value(value).unwrap()
}

fn png() -> ImageInput {
    ImageInput::from_bytes(vec![0x89, b'P', b'N', b'G'])
}

#[test]
fn test_absent_model_uses_fallback_rule() {
    let router = router(RegistryState::empty());
    for (ph, crop) in [(5.5, "Soybean"), (6.5, "Wheat"), (8.0, "Cotton")] {
        let result = router.predict_raw(Capability::CropRecommender, &raw(json!({ "ph": ph })));
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.fallback_reason, Some(FallbackReason::NoModel));
        assert_eq!(result.value.as_label(), Some(crop));
    }
}

#[test]
fn test_every_capability_answers_without_models() {
    let router = router(RegistryState::empty());
    for cap in Capability::ALL {
        let result = router.predict_raw(cap, &Map::new());
        assert_eq!(result.capability, cap);
        assert!(result.confidence.map_or(true, |c| (0.0..=1.0).contains(&c)));
    }
}

#[test]
fn test_failed_load_falls_back() {
    let state = builder()
        .failed(
            Capability::FertilizerRecommender,
            "models/fertilizerRecommendation.pkl",
            ArtifactLoadError::backend("models/fertilizerRecommendation.pkl", "bad pickle"),
        )
        .build();
    let result = router(state).predict_raw(
        Capability::FertilizerRecommender,
        &raw(json!({"nitrogen": 4})),
    );
    assert_eq!(result.fallback_reason, Some(FallbackReason::LoadFailed));
    assert_eq!(result.value.as_label(), Some("Urea (Nitrogen rich)"));
}

#[test]
fn test_model_error_and_panic_fall_back() {
    for behaviour in [Behaviour::Fail, Behaviour::Panic] {
        let model = ScriptedModel::new(InputKind::Tabular, behaviour);
        let state = builder()
            .model(Capability::NitrogenEstimator, "models/predictNitrogen.pkl", Arc::new(model))
            .build();
        let result = router(state).predict_raw(Capability::NitrogenEstimator, &raw(json!({"ph": 9})));
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.fallback_reason, Some(FallbackReason::ModelFailed));
        assert_eq!(result.value.as_scalar(), Some(11.0));
    }
}

#[test]
fn test_model_result_with_probabilities() {
    let model = ScriptedModel::new(InputKind::Tabular, Behaviour::Answer(ModelOutput::Label("Rice".into())))
        .with_proba(vec![0.1, 0.85, 0.05]);
    let state = builder()
        .model(Capability::CropRecommender, "models/cropRecommendation.pkl", Arc::new(model))
        .build();

    let result = router(state).predict_raw(Capability::CropRecommender, &Map::new());
    assert_eq!(result.source, Source::Model);
    assert_eq!(result.fallback_reason, None);
    assert_eq!(result.value.as_label(), Some("Rice"));
    assert_eq!(result.confidence, Some(0.85));
    assert_eq!(result.tag.as_deref(), Some("scripted:cropRecommendation.pkl"));
    assert_eq!(
        result.advisory.as_deref(),
        Some("Recommended based on soil and nutrient profile.")
    );
}

#[test]
fn test_nominal_confidence_without_probabilities() {
    let crop = ScriptedModel::new(InputKind::Tabular, Behaviour::Answer(ModelOutput::Scalar(4.0)));
    let nitrogen = ScriptedModel::new(InputKind::Tabular, Behaviour::Answer(ModelOutput::Scalar(14.5)));
    let state = builder()
        .model(Capability::CropRecommender, "models/crop.pkl", Arc::new(crop))
        .model(Capability::NitrogenEstimator, "models/predictNitrogen.pkl", Arc::new(nitrogen))
        .build();
    let router = router(state);

    let crop = router.predict_raw(Capability::CropRecommender, &Map::new());
    assert_eq!(crop.value, PredictionValue::Label("4".into()));
    assert_eq!(crop.confidence, Some(0.8));

    let n = router.predict_raw(Capability::NitrogenEstimator, &Map::new());
    assert_eq!(n.value, PredictionValue::Scalar(14.5));
    assert_eq!(n.confidence, None);
    assert_eq!(n.advisory.as_deref(), Some("Model predicted"));
}

#[test]
fn test_non_finite_model_output_falls_back() {
    let model = ScriptedModel::new(InputKind::Tabular, Behaviour::Answer(ModelOutput::Scalar(f64::NAN)));
    let state = builder()
        .model(Capability::PotassiumEstimator, "models/predictPotassium.pkl", Arc::new(model))
        .build();
    let result = router(state).predict_raw(Capability::PotassiumEstimator, &Map::new());
    assert_eq!(result.fallback_reason, Some(FallbackReason::ModelFailed));
    assert_eq!(result.value.as_scalar(), Some(9.0));
}

#[test]
fn test_image_class_is_mapped_through_labels() {
    let model = ScriptedModel::new(InputKind::Image, Behaviour::Answer(ModelOutput::Class(1)))
        .with_proba(vec![2.0, 4.0, 0.5]);
    let state = builder()
        .model(Capability::SoilImageClassifier, "models/soil_cnn.h5", Arc::new(model))
        .labels(
            "models/labels.json",
            LabelList::new(vec!["Loamy".into(), "Clay".into(), "Sandy".into()]),
        )
        .build();

    let result = router(state).predict_image(Capability::SoilImageClassifier, png());
    assert_eq!(result.value.as_label(), Some("Clay"));
    let conf = result.confidence.unwrap();
    assert!(conf > 0.5 && conf < 1.0, "softmaxed logits, got {conf}");
}

#[test]
fn test_image_class_without_labels_gets_placeholder() {
    let model = ScriptedModel::new(InputKind::Image, Behaviour::Answer(ModelOutput::Class(3)));
    let state = builder()
        .model(Capability::DiseaseClassifier, "models/leaf_disease.h5", Arc::new(model))
        .build();
    let result = router(state).predict_image(Capability::DiseaseClassifier, png());
    assert_eq!(result.value.as_label(), Some("class_3"));
    assert_eq!(result.confidence, None);
}

#[test]
fn test_wrong_input_kind_falls_back() {
    let model = ScriptedModel::new(InputKind::Image, Behaviour::Answer(ModelOutput::Class(0)));
    let state = builder()
        .model(Capability::SoilImageClassifier, "models/soil_cnn.h5", Arc::new(model))
        .build();
    let features = FeatureVectorBuilder::defaults(Capability::SoilImageClassifier);
    let result = router(state).predict(Capability::SoilImageClassifier, features);
    assert_eq!(result.fallback_reason, Some(FallbackReason::ModelFailed));
    assert_eq!(result.value.as_label(), Some("Loamy"));
}

#[test]
fn test_features_for_another_capability_are_rejected() {
    let model = Arc::new(ScriptedModel::new(
        InputKind::Tabular,
        Behaviour::Answer(ModelOutput::Label("Rice".into())),
    ));
    let state = builder()
        .model(Capability::CropRecommender, "models/crop.pkl", model.clone())
        .build();
    let features = FeatureVectorBuilder::build(Capability::NitrogenEstimator, &raw(json!({"ph": 5})));
    let result = router(state).predict(Capability::CropRecommender, features);

    assert_eq!(result.fallback_reason, Some(FallbackReason::ModelFailed));
    // Fallback sees the crop defaults (pH 7), not the nitrogen input.
    assert_eq!(result.value.as_label(), Some("Cotton"));
    assert!(model.seen.lock().unwrap().is_empty());
}

#[test]
fn test_preprocessor_transforms_rows() {
    let model = Arc::new(ScriptedModel::new(InputKind::Tabular, Behaviour::Answer(ModelOutput::Scalar(1.0))));
    let state = builder()
        .model(Capability::PhosphorusEstimator, "models/predictPhosphorus.pkl", model.clone())
        .preprocessor("models/preprocessor.pkl", Arc::new(Doubler { fail: false }))
        .build();
    router(state).predict_raw(Capability::PhosphorusEstimator, &raw(json!({"ph": 6, "soil_moisture": 20, "temperature": 30})));
    assert_eq!(model.seen.lock().unwrap()[0], vec![12.0, 40.0, 60.0]);
}

#[test]
fn test_failing_preprocessor_uses_raw_row() {
    let model = Arc::new(ScriptedModel::new(InputKind::Tabular, Behaviour::Answer(ModelOutput::Scalar(1.0))));
    let state = builder()
        .model(Capability::PhosphorusEstimator, "models/predictPhosphorus.pkl", model.clone())
        .preprocessor("models/preprocessor.pkl", Arc::new(Doubler { fail: true }))
        .build();
    let result = router(state).predict_raw(Capability::PhosphorusEstimator, &Map::new());
    assert_eq!(result.source, Source::Model);
    assert_eq!(model.seen.lock().unwrap()[0], vec![7.0, 30.0, 25.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_returns_fallback() {
    let model = ScriptedModel::new(
        InputKind::Tabular,
        Behaviour::Sleep(Duration::from_millis(400), ModelOutput::Label("Rice".into())),
    );
    let state = builder()
        .model(Capability::CropRecommender, "models/crop.pkl", Arc::new(model))
        .build();
    let router = router(state);

    let features = FeatureVectorBuilder::build(Capability::CropRecommender, &raw(json!({"ph": 5.0})));
    let result = router
        .predict_within(Capability::CropRecommender, features, Duration::from_millis(20))
        .await;
    assert_eq!(result.source, Source::Fallback);
    assert_eq!(result.fallback_reason, Some(FallbackReason::Timeout));
    assert_eq!(result.value.as_label(), Some("Soybean"));
}

#[tokio::test]
async fn test_within_deadline_returns_model_result() {
    let model = ScriptedModel::new(InputKind::Tabular, Behaviour::Answer(ModelOutput::Label("Maize".into())));
    let state = builder()
        .model(Capability::CropRecommender, "models/crop.pkl", Arc::new(model))
        .build();
    let result = router(state)
        .predict_within(
            Capability::CropRecommender,
            FeatureVectorBuilder::defaults(Capability::CropRecommender),
            Duration::from_secs(5),
        )
        .await;
    assert_eq!(result.source, Source::Model);
    assert_eq!(result.value.as_label(), Some("Maize"));
}
