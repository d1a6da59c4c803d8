//! Python model backend via PyO3.
//!
//! Loads the artifacts ONNX cannot: Keras `.h5` / `.keras` files,
//! TensorFlow SavedModels, PyTorch checkpoints and scikit-learn pickles.
//!
//! # Architecture
//!
//! ```text
//! ModelRegistry
//!   └─▶ PythonRuntime::load_model(path, flavor)
//!         └─▶ soilsense_bridge.load(path, flavor)        (embedded helper)
//! InferenceRouter
//!   └─▶ PyModel::predict(input)
//!         └─▶ soilsense_bridge.predict(model, ...) -> JSON
//!               └─▶ ModelOutput
//! ```
//!
//! The helper module ships inside the binary (`python/soilsense_bridge.py`)
//! and answers in JSON, so only strings cross the FFI boundary.
//!
//! The PyO3 half is behind the `python` feature; without it only the
//! protocol types are compiled and [`is_available`] returns `false`.

pub mod error;
pub mod protocol;

#[cfg(feature = "python")]
pub mod runtime;

pub use error::{MlBridgeError, Result};
pub use protocol::{decode_floats, decode_output, ModelFlavor, BRIDGE_SOURCE};

#[cfg(feature = "python")]
pub use runtime::{PyModel, PyTransform, PythonRuntime};

/// Whether this build embeds a Python interpreter.
pub const fn is_available() -> bool {
    cfg!(feature = "python")
}
