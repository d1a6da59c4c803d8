//! ONNX session wrapper shared by every ONNX-backed artifact.

use crate::error::{OnnxError, Result};
use ort::inputs;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::{TensorRef, ValueType};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// One output tensor, copied out of the session so the lock can be released.
#[derive(Debug, Clone)]
pub enum OutputTensor {
    F32 { shape: Vec<i64>, data: Vec<f32> },
    I64 { shape: Vec<i64>, data: Vec<i64> },
    /// Output kinds we do not consume (sequences, maps, strings)
    Unsupported,
}

/// Declared element type and shape of one model output.
#[derive(Debug, Clone)]
pub struct OutputInfo {
    pub name: String,
    pub element: Option<TensorElementType>,
    pub shape: Vec<i64>,
}

impl OutputInfo {
    /// Float output with more than one value per row (probabilities / logits).
    pub fn is_distribution(&self) -> bool {
        self.element == Some(TensorElementType::Float32)
            && self.shape.last().map(|d| *d != 1).unwrap_or(false)
    }
}

/// ONNX inference session.
///
/// `ort::Session::run` needs exclusive access, so calls are serialised per
/// session; loaded models are otherwise read-only.
pub struct OnnxSession {
    model_path: PathBuf,
    input_shape: Vec<i64>,
    outputs: Vec<OutputInfo>,
    session: Mutex<Session>,
}

impl OnnxSession {
    /// Load an ONNX model on the CPU execution provider.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        log::info!("Loading ONNX model from: {:?}", model_path);

        if !model_path.exists() {
            return Err(OnnxError::ModelLoadFailed(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        let session = Session::builder()
            .map_err(|e| OnnxError::SessionCreationFailed(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                OnnxError::SessionCreationFailed(format!("Failed to set optimization level: {}", e))
            })?
            .with_intra_threads(2)
            .map_err(|e| {
                OnnxError::SessionCreationFailed(format!("Failed to set intra threads: {}", e))
            })?
            .commit_from_file(model_path)
            .map_err(|e| OnnxError::ModelLoadFailed(e.to_string()))?;

        let input_shape = session
            .inputs
            .first()
            .map(|input| tensor_shape(&input.input_type))
            .ok_or_else(|| OnnxError::ModelLoadFailed("model declares no inputs".to_string()))?;

        let outputs: Vec<OutputInfo> = session
            .outputs
            .iter()
            .map(|output| OutputInfo {
                name: output.name.clone(),
                element: tensor_element(&output.output_type),
                shape: tensor_shape(&output.output_type),
            })
            .collect();

        log::debug!(
            "ONNX model {:?}: input shape {:?}, {} outputs",
            model_path,
            input_shape,
            outputs.len()
        );

        Ok(Self {
            model_path: model_path.to_path_buf(),
            input_shape,
            outputs,
            session: Mutex::new(session),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Declared shape of the first input (`-1` for dynamic dimensions).
    pub fn input_shape(&self) -> &[i64] {
        &self.input_shape
    }

    pub fn outputs(&self) -> &[OutputInfo] {
        &self.outputs
    }

    /// Run the model on one `f32` tensor and copy every output out.
    pub fn run_f32(&self, shape: Vec<i64>, data: &[f32]) -> Result<Vec<OutputTensor>> {
        let input = TensorRef::from_array_view((shape, data))
            .map_err(|e| OnnxError::InvalidInput(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs![input])
            .map_err(|e| OnnxError::InferenceFailed(e.to_string()))?;

        let mut tensors = Vec::with_capacity(outputs.len());
        for idx in 0..outputs.len() {
            let value = &outputs[idx];
            let tensor = if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                OutputTensor::F32 {
                    shape: shape.iter().copied().collect(),
                    data: data.to_vec(),
                }
            } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
                OutputTensor::I64 {
                    shape: shape.iter().copied().collect(),
                    data: data.to_vec(),
                }
            } else {
                OutputTensor::Unsupported
            };
            tensors.push(tensor);
        }
        Ok(tensors)
    }
}

fn tensor_shape(value_type: &ValueType) -> Vec<i64> {
    match value_type {
        ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
        _ => Vec::new(),
    }
}

fn tensor_element(value_type: &ValueType) -> Option<TensorElementType> {
    match value_type {
        ValueType::Tensor { ty, .. } => Some(*ty),
        _ => None,
    }
}
