//! Capability vocabulary and the artifact-name alias table.
//!
//! A capability is a named prediction task ("crop-recommender") independent
//! of whether a model or a heuristic backs it. Artifacts on disk are routed
//! to capabilities by case-insensitive substring match of their file stem
//! against [`CAPABILITY_ALIASES`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named prediction task served by the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Soil type from a photo (Loamy / Sandy / Clay ...)
    #[serde(rename = "soil-image-classifier")]
    SoilImageClassifier,

    /// Plant disease from a leaf photo
    #[serde(rename = "disease-classifier")]
    DiseaseClassifier,

    /// Crop choice from temperature, moisture and pH
    #[serde(rename = "crop-recommender")]
    CropRecommender,

    /// Fertilizer class from N/P/K, pH and moisture
    #[serde(rename = "fertilizer-recommender")]
    FertilizerRecommender,

    /// Nitrogen level estimate
    #[serde(rename = "nitrogen-estimator")]
    NitrogenEstimator,

    /// Phosphorus level estimate
    #[serde(rename = "phosphorus-estimator")]
    PhosphorusEstimator,

    /// Potassium level estimate
    #[serde(rename = "potassium-estimator")]
    PotassiumEstimator,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 7] = [
        Capability::SoilImageClassifier,
        Capability::DiseaseClassifier,
        Capability::CropRecommender,
        Capability::FertilizerRecommender,
        Capability::NitrogenEstimator,
        Capability::PhosphorusEstimator,
        Capability::PotassiumEstimator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SoilImageClassifier => "soil-image-classifier",
            Self::DiseaseClassifier => "disease-classifier",
            Self::CropRecommender => "crop-recommender",
            Self::FertilizerRecommender => "fertilizer-recommender",
            Self::NitrogenEstimator => "nitrogen-estimator",
            Self::PhosphorusEstimator => "phosphorus-estimator",
            Self::PotassiumEstimator => "potassium-estimator",
        }
    }

    /// The kind of input a model serving this capability consumes.
    pub fn input_kind(&self) -> InputKind {
        match self {
            Self::SoilImageClassifier | Self::DiseaseClassifier => InputKind::Image,
            _ => InputKind::Tabular,
        }
    }

    /// Artifact kind that may occupy this capability's slot.
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self.input_kind() {
            InputKind::Image => ArtifactKind::ImageClassifier,
            InputKind::Tabular => ArtifactKind::TabularModel,
        }
    }

    /// Confidence reported for a successful model call when the model
    /// exposes no probability signal of its own.
    ///
    /// Declared rather than measured, so the router clips it to `[0, 1]`.
    pub fn nominal_model_confidence(&self) -> Option<f64> {
        match self {
            Self::CropRecommender => Some(0.8),
            Self::FertilizerRecommender => Some(0.75),
            _ => None,
        }
    }

    /// Aliases matched against artifact stems for this capability.
    pub fn aliases(&self) -> &'static [&'static str] {
        CAPABILITY_ALIASES
            .iter()
            .find(|(cap, _)| cap == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|cap| cap.as_str() == wanted)
            .ok_or_else(|| format!("unknown capability: {s}"))
    }
}

/// What a model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Tabular,
    Image,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tabular => f.write_str("tabular"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// Classification of a file found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    ImageClassifier,
    TabularModel,
    Preprocessor,
    LabelList,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ImageClassifier => "image-classifier",
            Self::TabularModel => "tabular-model",
            Self::Preprocessor => "preprocessor",
            Self::LabelList => "label-list",
        };
        f.write_str(s)
    }
}

/// Stem → capability alias table.
///
/// Order matters: the first capability (of a compatible kind) whose alias
/// occurs in the lowercase stem wins. Disease is checked before soil so
/// `soil_disease_cnn` routes to the disease classifier; the nutrient and
/// fertilizer estimators are checked before the generic `crop` alias.
pub const CAPABILITY_ALIASES: &[(Capability, &[&str])] = &[
    (Capability::DiseaseClassifier, &["disease", "leaf", "plantvillage", "plant_village"]),
    (Capability::SoilImageClassifier, &["soil_cnn", "cnn_model", "soil", "cnn"]),
    (Capability::FertilizerRecommender, &["fertilizer", "fertiliser"]),
    (Capability::NitrogenEstimator, &["nitrogen"]),
    (Capability::PhosphorusEstimator, &["phosphorus", "phosphorous"]),
    (Capability::PotassiumEstimator, &["potassium"]),
    (Capability::CropRecommender, &["croprecommendation", "crop_recommendation", "crop"]),
];

/// Lowercase stems recognised as a feature preprocessor.
///
/// Any stem starting with `preprocessor` also counts (`preprocessor copy`).
pub const PREPROCESSOR_STEMS: &[&str] = &["preprocessor", "scaler", "preproc"];

/// Route an artifact to a capability by kind and stem.
///
/// Returns `None` when no alias of a kind-compatible capability matches;
/// such artifacts are loaded but never invoked automatically.
pub fn capability_for(kind: ArtifactKind, stem: &str) -> Option<Capability> {
    let stem = stem.to_lowercase();
    CAPABILITY_ALIASES
        .iter()
        .filter(|(cap, _)| cap.artifact_kind() == kind)
        .find(|(_, aliases)| aliases.iter().any(|alias| stem.contains(alias)))
        .map(|(cap, _)| *cap)
}
