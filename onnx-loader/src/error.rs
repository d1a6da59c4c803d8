use common::InferenceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OnnxError>;

#[derive(Error, Debug)]
pub enum OnnxError {
    #[error("Failed to create session: {0}")]
    SessionCreationFailed(String),

    #[error("Failed to load model: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<OnnxError> for InferenceError {
    fn from(err: OnnxError) -> Self {
        match err {
            OnnxError::InvalidInput(msg) => InferenceError::InvalidInput(msg),
            OnnxError::Image(e) => InferenceError::InvalidInput(e.to_string()),
            OnnxError::InvalidOutput(msg) => InferenceError::InvalidOutput(msg),
            other => InferenceError::Backend(other.to_string()),
        }
    }
}
