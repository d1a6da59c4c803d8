//! Embedded CPython runtime and the models it hosts.

use crate::error::{MlBridgeError, Result};
use crate::protocol::{
    decode_floats, decode_output, ModelFlavor, BRIDGE_FILE, BRIDGE_MODULE, BRIDGE_SOURCE,
};
use common::{
    FeatureTransform, InferenceError, InferenceModel, InputKind, ModelInput, ModelOutput,
};
use pyo3::prelude::*;
use pyo3::sync::GILOnceCell;
use pyo3::types::{PyBytes, PyList, PyModule, PyTuple};
use std::path::{Path, PathBuf};

static BRIDGE: GILOnceCell<Py<PyModule>> = GILOnceCell::new();

/// Compile the helper module once per interpreter.
fn bridge_module(py: Python<'_>) -> Result<Bound<'_, PyModule>> {
    let module = BRIDGE.get_or_try_init(py, || {
        PyModule::from_code_bound(py, BRIDGE_SOURCE, BRIDGE_FILE, BRIDGE_MODULE)
            .map(Bound::unbind)
            .map_err(|e| MlBridgeError::ModuleImport(format!("{}: {}", BRIDGE_MODULE, e)))
    })?;
    Ok(module.bind(py).clone())
}

/// Calls a helper function and returns its JSON reply.
fn call_bridge(py: Python<'_>, func_name: &str, args: impl IntoPy<Py<PyTuple>>) -> Result<String> {
    let module = bridge_module(py)?;
    let func = module.getattr(func_name).map_err(|e| {
        MlBridgeError::FunctionCall(format!("Function {} not found: {}", func_name, e))
    })?;
    let result = func
        .call1(args)
        .map_err(|e| MlBridgeError::FunctionCall(format!("Function {} failed: {}", func_name, e)))?;
    result.extract().map_err(|e| {
        MlBridgeError::TypeConversion(format!(
            "Failed to convert result from {}: {}",
            func_name, e
        ))
    })
}

fn payload<'py>(py: Python<'py>, input: &ModelInput) -> Bound<'py, PyAny> {
    match input {
        ModelInput::Tabular(values) => PyList::new_bound(py, values).into_any(),
        ModelInput::Image(image) => PyBytes::new_bound(py, image.bytes()).into_any(),
    }
}

/// Handle on the embedded interpreter.
///
/// Creating one initialises CPython (via `auto-initialize`) and compiles the
/// helper module, so a missing or broken Python install is reported once at
/// registry load rather than per artifact.
#[derive(Debug, Clone, Copy)]
pub struct PythonRuntime {
    _private: (),
}

impl PythonRuntime {
    pub fn initialize() -> Result<Self> {
        let version = Python::with_gil(|py| {
            let sys = py
                .import_bound("sys")
                .map_err(|e| MlBridgeError::PythonInit(format!("Failed to import sys: {}", e)))?;
            let version: String = sys
                .getattr("version")
                .and_then(|v| v.extract())
                .map_err(|e| MlBridgeError::PythonInit(e.to_string()))?;
            bridge_module(py)?;
            Ok::<String, MlBridgeError>(version)
        })?;
        log::info!("Python runtime ready: {}", version.lines().next().unwrap_or_default());
        Ok(Self { _private: () })
    }

    /// Load a model artifact with its framework's own loader.
    pub fn load_model(
        &self,
        path: &Path,
        flavor: ModelFlavor,
        input_kind: InputKind,
    ) -> Result<PyModel> {
        log::info!("Loading {} model from: {:?}", flavor, path);
        let path_str = path.to_string_lossy().into_owned();
        let (handle, has_proba) = Python::with_gil(|py| {
            let module = bridge_module(py)?;
            let model = module
                .getattr("load")
                .and_then(|f| f.call1((path_str.as_str(), flavor.as_str())))
                .map_err(|e| MlBridgeError::FunctionCall(format!("load failed: {}", e)))?;
            let has_proba: bool = module
                .getattr("has_proba")
                .and_then(|f| f.call1((&model, flavor.as_str())))
                .and_then(|v| v.extract())
                .map_err(|e| MlBridgeError::FunctionCall(format!("has_proba failed: {}", e)))?;
            Ok::<_, MlBridgeError>((model.unbind(), has_proba))
        })?;

        Ok(PyModel {
            handle,
            flavor,
            input_kind,
            has_proba,
            path: path.to_path_buf(),
        })
    }

    /// Load a scaler / encoder exposing `transform`.
    pub fn load_transform(&self, path: &Path, flavor: ModelFlavor) -> Result<PyTransform> {
        log::info!("Loading {} preprocessor from: {:?}", flavor, path);
        let path_str = path.to_string_lossy().into_owned();
        let handle = Python::with_gil(|py| {
            let module = bridge_module(py)?;
            let obj = module
                .getattr("load")
                .and_then(|f| f.call1((path_str.as_str(), flavor.as_str())))
                .map_err(|e| MlBridgeError::FunctionCall(format!("load failed: {}", e)))?;
            if !obj.hasattr("transform").unwrap_or(false) {
                return Err(MlBridgeError::TypeConversion(
                    "preprocessor has no transform method".to_string(),
                ));
            }
            Ok(obj.unbind())
        })?;
        Ok(PyTransform { handle, flavor })
    }
}

/// A model object living in the Python heap.
pub struct PyModel {
    handle: Py<PyAny>,
    flavor: ModelFlavor,
    input_kind: InputKind,
    has_proba: bool,
    path: PathBuf,
}

impl PyModel {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flavor(&self) -> ModelFlavor {
        self.flavor
    }

    fn call(&self, func_name: &str, input: &ModelInput) -> Result<String> {
        let is_image = input.kind() == InputKind::Image;
        Python::with_gil(|py| {
            let args = (
                self.handle.bind(py),
                self.flavor.as_str(),
                payload(py, input),
                is_image,
            );
            call_bridge(py, func_name, args)
        })
    }

    fn check_input(&self, input: &ModelInput) -> std::result::Result<(), InferenceError> {
        if input.kind() != self.input_kind {
            return Err(InferenceError::InputMismatch {
                expected: self.input_kind,
                actual: input.kind(),
            });
        }
        Ok(())
    }
}

impl InferenceModel for PyModel {
    fn backend(&self) -> &str {
        self.flavor.backend_name()
    }

    fn input_kind(&self) -> InputKind {
        self.input_kind
    }

    fn supports_confidence(&self) -> bool {
        self.has_proba
    }

    fn predict(&self, input: &ModelInput) -> std::result::Result<ModelOutput, InferenceError> {
        self.check_input(input)?;
        let reply = self.call("predict", input)?;
        Ok(decode_output(&reply)?)
    }

    fn predict_proba(&self, input: &ModelInput) -> std::result::Result<Vec<f64>, InferenceError> {
        self.check_input(input)?;
        let reply = self.call("predict_proba", input)?;
        Ok(decode_floats(&reply)?)
    }
}

/// A preprocessor object living in the Python heap.
pub struct PyTransform {
    handle: Py<PyAny>,
    flavor: ModelFlavor,
}

impl FeatureTransform for PyTransform {
    fn backend(&self) -> &str {
        self.flavor.backend_name()
    }

    fn transform(&self, row: &[f64]) -> std::result::Result<Vec<f64>, InferenceError> {
        let reply = Python::with_gil(|py| {
            let args = (self.handle.bind(py), PyList::new_bound(py, row));
            call_bridge(py, "transform", args)
        })?;
        Ok(decode_floats(&reply)?)
    }
}
