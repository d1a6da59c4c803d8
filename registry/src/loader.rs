//! Kind-specific artifact loading.

use common::{ArtifactLoadError, ModelHandle, TransformHandle};
use soilsense_artifacts::{ArtifactDescriptor, ArtifactFormat, LabelList, ScanError};
use std::fmt;

/// What a successful load produced.
pub enum LoadedArtifact {
    Model(ModelHandle),
    Transform(TransformHandle),
    Labels(LabelList),
}

impl fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(m) => write!(f, "Model({})", m.backend()),
            Self::Transform(t) => write!(f, "Transform({})", t.backend()),
            Self::Labels(l) => write!(f, "Labels({})", l.len()),
        }
    }
}

/// Turns a descriptor into a usable artifact.
///
/// The registry calls this once per descriptor during a load; errors are
/// recorded against the artifact and never abort the load.
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, descriptor: &ArtifactDescriptor) -> Result<LoadedArtifact, ArtifactLoadError>;
}

/// Loader dispatching on artifact format to the compiled-in backends.
///
/// Without the `onnx` / `python` features the corresponding artifacts fail
/// with [`ArtifactLoadError::BackendUnavailable`] and their capabilities
/// fall back.
#[derive(Default)]
pub struct DefaultLoader {
    #[cfg(feature = "python")]
    python: std::sync::OnceLock<Result<soilsense_python_bridge::PythonRuntime, String>>,
}

impl DefaultLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_labels(&self, descriptor: &ArtifactDescriptor) -> Result<LoadedArtifact, ArtifactLoadError> {
        LabelList::from_path(&descriptor.path, descriptor.format)
            .map(LoadedArtifact::Labels)
            .map_err(|e| match e {
                ScanError::Io { path, source } => ArtifactLoadError::unreadable(path, source),
                ScanError::InvalidLabels { path, reason } => {
                    ArtifactLoadError::malformed(path, reason)
                }
            })
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, descriptor: &ArtifactDescriptor) -> Result<LoadedArtifact, ArtifactLoadError> {
        use common::ArtifactKind;
        use soilsense_onnx_loader::{OnnxImageClassifier, OnnxPreprocessor, OnnxTabularModel};
        use std::sync::Arc;

        let path = &descriptor.path;
        let err = |e: soilsense_onnx_loader::OnnxError| ArtifactLoadError::backend(path, e);
        Ok(match descriptor.kind {
            ArtifactKind::ImageClassifier => {
                LoadedArtifact::Model(Arc::new(OnnxImageClassifier::load(path).map_err(err)?))
            }
            ArtifactKind::TabularModel => {
                LoadedArtifact::Model(Arc::new(OnnxTabularModel::load(path).map_err(err)?))
            }
            ArtifactKind::Preprocessor => {
                LoadedArtifact::Transform(Arc::new(OnnxPreprocessor::load(path).map_err(err)?))
            }
            ArtifactKind::LabelList => {
                return Err(ArtifactLoadError::UnsupportedFormat { path: path.clone() })
            }
        })
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, descriptor: &ArtifactDescriptor) -> Result<LoadedArtifact, ArtifactLoadError> {
        Err(ArtifactLoadError::BackendUnavailable {
            backend: "onnx",
            kind: descriptor.kind,
            path: descriptor.path.clone(),
        })
    }

    #[cfg(feature = "python")]
    fn load_python(&self, descriptor: &ArtifactDescriptor) -> Result<LoadedArtifact, ArtifactLoadError> {
        use common::{ArtifactKind, InputKind};
        use soilsense_python_bridge::{ModelFlavor, PythonRuntime};
        use std::sync::Arc;

        let path = &descriptor.path;
        let runtime = self
            .python
            .get_or_init(|| PythonRuntime::initialize().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|reason| ArtifactLoadError::backend(path, reason))?;

        let flavor = match descriptor.format {
            ArtifactFormat::Keras => ModelFlavor::Keras,
            ArtifactFormat::SavedModel => ModelFlavor::SavedModel,
            ArtifactFormat::Torch => ModelFlavor::Torch,
            ArtifactFormat::Pickle => ModelFlavor::Pickle,
            ArtifactFormat::Joblib => ModelFlavor::Joblib,
            _ => return Err(ArtifactLoadError::UnsupportedFormat { path: path.clone() }),
        };
        let err = |e: soilsense_python_bridge::MlBridgeError| ArtifactLoadError::backend(path, e);

        Ok(match descriptor.kind {
            ArtifactKind::ImageClassifier => LoadedArtifact::Model(Arc::new(
                runtime
                    .load_model(path, flavor, InputKind::Image)
                    .map_err(err)?,
            )),
            ArtifactKind::TabularModel => LoadedArtifact::Model(Arc::new(
                runtime
                    .load_model(path, flavor, InputKind::Tabular)
                    .map_err(err)?,
            )),
            ArtifactKind::Preprocessor => LoadedArtifact::Transform(Arc::new(
                runtime.load_transform(path, flavor).map_err(err)?,
            )),
            ArtifactKind::LabelList => {
                return Err(ArtifactLoadError::UnsupportedFormat { path: path.clone() })
            }
        })
    }

    #[cfg(not(feature = "python"))]
    fn load_python(&self, descriptor: &ArtifactDescriptor) -> Result<LoadedArtifact, ArtifactLoadError> {
        Err(ArtifactLoadError::BackendUnavailable {
            backend: "python",
            kind: descriptor.kind,
            path: descriptor.path.clone(),
        })
    }
}

impl ArtifactLoader for DefaultLoader {
    fn load(&self, descriptor: &ArtifactDescriptor) -> Result<LoadedArtifact, ArtifactLoadError> {
        if !descriptor.path.exists() {
            return Err(ArtifactLoadError::unreadable(&descriptor.path, "file vanished"));
        }
        match descriptor.format {
            ArtifactFormat::LabelJson | ArtifactFormat::LabelText => self.load_labels(descriptor),
            ArtifactFormat::Onnx => self.load_onnx(descriptor),
            format if format.needs_python() => self.load_python(descriptor),
            _ => Err(ArtifactLoadError::UnsupportedFormat {
                path: descriptor.path.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soilsense_artifacts::classify;

    #[test]
    fn test_labels_load_without_backends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"["Loamy", "Sandy"]"#).unwrap();

        let descriptor = classify(&path).unwrap();
        match DefaultLoader::new().load(&descriptor).unwrap() {
            LoadedArtifact::Labels(labels) => assert_eq!(labels.len(), 2),
            other => panic!("expected labels, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_labels_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, "{").unwrap();

        let descriptor = classify(&path).unwrap();
        let err = DefaultLoader::new().load(&descriptor).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Malformed { .. }));
    }

    #[cfg(not(feature = "python"))]
    #[test]
    fn test_pickle_without_python_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cropRecommendation.pkl");
        std::fs::write(&path, b"stub").unwrap();

        let descriptor = classify(&path).unwrap();
        let err = DefaultLoader::new().load(&descriptor).unwrap_err();
        assert!(matches!(
            err,
            ArtifactLoadError::BackendUnavailable {
                backend: "python",
                ..
            }
        ));
    }
}
