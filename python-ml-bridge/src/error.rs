use common::InferenceError;

pub type Result<T> = std::result::Result<T, MlBridgeError>;

/// Error type for ML bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum MlBridgeError {
    /// Python initialization error
    #[error("Failed to initialize Python: {0}")]
    PythonInit(String),

    /// Python module import error
    #[error("Failed to import Python module: {0}")]
    ModuleImport(String),

    /// Python function call error
    #[error("Python function call failed: {0}")]
    FunctionCall(String),

    /// Type conversion error
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl From<MlBridgeError> for InferenceError {
    fn from(err: MlBridgeError) -> Self {
        match err {
            MlBridgeError::TypeConversion(msg) => InferenceError::InvalidOutput(msg),
            other => InferenceError::Backend(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for MlBridgeError {
    fn from(err: serde_json::Error) -> Self {
        MlBridgeError::TypeConversion(err.to_string())
    }
}
