//! The JSON protocol spoken by the embedded helper module.

use crate::error::{MlBridgeError, Result};
use common::ModelOutput;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Source of the embedded helper module.
pub const BRIDGE_SOURCE: &str = include_str!("../python/soilsense_bridge.py");
pub const BRIDGE_MODULE: &str = "soilsense_bridge";
pub const BRIDGE_FILE: &str = "soilsense_bridge.py";

/// Framework a Python-side artifact was saved with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFlavor {
    Keras,
    SavedModel,
    Torch,
    Pickle,
    Joblib,
}

impl ModelFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keras => "keras",
            Self::SavedModel => "saved-model",
            Self::Torch => "torch",
            Self::Pickle => "pickle",
            Self::Joblib => "joblib",
        }
    }

    /// Backend name reported for models of this flavor.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Keras | Self::SavedModel => "keras",
            Self::Torch => "torch",
            Self::Pickle | Self::Joblib => "sklearn",
        }
    }
}

impl fmt::Display for ModelFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
enum Reply {
    Class(usize),
    Label(String),
    Scalar(f64),
    Record(Map<String, Value>),
}

/// Decode a `predict` reply.
pub fn decode_output(reply: &str) -> Result<ModelOutput> {
    let reply: Reply = serde_json::from_str(reply)?;
    Ok(match reply {
        Reply::Class(idx) => ModelOutput::Class(idx),
        Reply::Label(label) => ModelOutput::Label(label),
        Reply::Scalar(v) if v.is_finite() => ModelOutput::Scalar(v),
        Reply::Scalar(v) => {
            return Err(MlBridgeError::TypeConversion(format!(
                "non-finite prediction {v}"
            )))
        }
        Reply::Record(map) => ModelOutput::Record(map),
    })
}

/// Decode a `predict_proba` / `transform` reply.
pub fn decode_floats(reply: &str) -> Result<Vec<f64>> {
    Ok(serde_json::from_str(reply)?)
}
