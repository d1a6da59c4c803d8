//! `InferenceModel` / `FeatureTransform` implementations over an ONNX session.

use crate::error::{OnnxError, Result};
use crate::preprocess::{argmax, image_to_tensor, ImageSpec};
use crate::session::{OnnxSession, OutputTensor};
use common::{
    FeatureTransform, InferenceError, InferenceModel, InputKind, ModelInput, ModelOutput,
};
use std::path::Path;

const BACKEND: &str = "onnx";

/// Image classifier: one image in, class distribution out.
pub struct OnnxImageClassifier {
    session: OnnxSession,
    spec: ImageSpec,
}

impl OnnxImageClassifier {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let session = OnnxSession::load(path)?;
        let spec = ImageSpec::from_input_shape(session.input_shape());
        log::info!(
            "ONNX image classifier expects {}x{} {:?}",
            spec.width,
            spec.height,
            spec.layout
        );
        Ok(Self { session, spec })
    }

    fn distribution(&self, input: &ModelInput) -> Result<Vec<f32>> {
        let ModelInput::Image(image) = input else {
            return Err(OnnxError::InvalidInput("image classifier needs an image".to_string()));
        };
        let data = image_to_tensor(image.bytes(), &self.spec)?;
        let outputs = self.session.run_f32(self.spec.tensor_shape(), &data)?;
        outputs
            .into_iter()
            .find_map(|out| match out {
                OutputTensor::F32 { data, .. } if !data.is_empty() => Some(data),
                _ => None,
            })
            .ok_or_else(|| OnnxError::InvalidOutput("no float output".to_string()))
    }
}

impl InferenceModel for OnnxImageClassifier {
    fn backend(&self) -> &str {
        BACKEND
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Image
    }

    fn supports_confidence(&self) -> bool {
        true
    }

    fn predict(&self, input: &ModelInput) -> std::result::Result<ModelOutput, InferenceError> {
        let dist = self.distribution(input)?;
        argmax(&dist)
            .map(ModelOutput::Class)
            .ok_or_else(|| InferenceError::InvalidOutput("empty class distribution".to_string()))
    }

    fn predict_proba(&self, input: &ModelInput) -> std::result::Result<Vec<f64>, InferenceError> {
        Ok(self.distribution(input)?.into_iter().map(f64::from).collect())
    }
}

/// Tabular classifier or regressor exported from scikit-learn / a small NN.
///
/// Output conventions handled:
/// - `label` (i64) + `probabilities` (f32) pairs from sklearn-onnx classifiers
/// - a single f32 value per row (regressors)
/// - a single f32 distribution per row (NN classifiers)
pub struct OnnxTabularModel {
    session: OnnxSession,
    n_features: Option<usize>,
    has_distribution: bool,
}

impl OnnxTabularModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let session = OnnxSession::load(path)?;
        let n_features = declared_features(session.input_shape());
        let has_distribution = session.outputs().iter().any(|o| o.is_distribution());
        Ok(Self {
            session,
            n_features,
            has_distribution,
        })
    }

    fn run(&self, input: &ModelInput) -> Result<Vec<OutputTensor>> {
        let row = tabular_row(input, self.n_features)?;
        self.session.run_f32(vec![1, row.len() as i64], &row)
    }
}

impl InferenceModel for OnnxTabularModel {
    fn backend(&self) -> &str {
        BACKEND
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Tabular
    }

    fn supports_confidence(&self) -> bool {
        self.has_distribution
    }

    fn predict(&self, input: &ModelInput) -> std::result::Result<ModelOutput, InferenceError> {
        let outputs = self.run(input)?;

        // Explicit label output wins over a distribution
        for out in &outputs {
            if let OutputTensor::I64 { data, .. } = out {
                if let Some(label) = data.first() {
                    return usize::try_from(*label).map(ModelOutput::Class).map_err(|_| {
                        InferenceError::InvalidOutput(format!("negative class label {label}"))
                    });
                }
            }
        }
        for out in outputs {
            if let OutputTensor::F32 { data, .. } = out {
                match data.len() {
                    0 => {}
                    1 => return Ok(ModelOutput::Scalar(f64::from(data[0]))),
                    _ => {
                        return argmax(&data).map(ModelOutput::Class).ok_or_else(|| {
                            InferenceError::InvalidOutput("empty class distribution".to_string())
                        })
                    }
                }
            }
        }
        Err(InferenceError::InvalidOutput(
            "model produced no tensor output".to_string(),
        ))
    }

    fn predict_proba(&self, input: &ModelInput) -> std::result::Result<Vec<f64>, InferenceError> {
        self.run(input)?
            .into_iter()
            .find_map(|out| match out {
                OutputTensor::F32 { data, .. } if data.len() > 1 => {
                    Some(data.into_iter().map(f64::from).collect())
                }
                _ => None,
            })
            .ok_or_else(|| InferenceError::InvalidOutput("no probability output".to_string()))
    }
}

/// Feature scaler exported to ONNX: `[1, n]` in, `[1, n]` out.
pub struct OnnxPreprocessor {
    session: OnnxSession,
    n_features: Option<usize>,
}

impl OnnxPreprocessor {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let session = OnnxSession::load(path)?;
        let n_features = declared_features(session.input_shape());
        Ok(Self {
            session,
            n_features,
        })
    }
}

impl FeatureTransform for OnnxPreprocessor {
    fn backend(&self) -> &str {
        BACKEND
    }

    fn transform(&self, row: &[f64]) -> std::result::Result<Vec<f64>, InferenceError> {
        let input = ModelInput::Tabular(row.to_vec());
        let row = tabular_row(&input, self.n_features)?;
        let outputs = self.session.run_f32(vec![1, row.len() as i64], &row)?;
        outputs
            .into_iter()
            .find_map(|out| match out {
                OutputTensor::F32 { data, .. } => Some(data.into_iter().map(f64::from).collect()),
                _ => None,
            })
            .ok_or_else(|| InferenceError::InvalidOutput("transform produced no floats".to_string()))
    }
}

fn declared_features(shape: &[i64]) -> Option<usize> {
    match shape {
        [_, n] if *n > 0 => Some(*n as usize),
        _ => None,
    }
}

fn tabular_row(input: &ModelInput, expected: Option<usize>) -> Result<Vec<f32>> {
    let ModelInput::Tabular(values) = input else {
        return Err(OnnxError::InvalidInput("tabular model needs a feature row".to_string()));
    };
    if let Some(n) = expected {
        if values.len() != n {
            return Err(OnnxError::InvalidInput(format!(
                "expected {} features, got {}",
                n,
                values.len()
            )));
        }
    }
    Ok(values.iter().map(|v| *v as f32).collect())
}
