use common::{capability_for, ArtifactKind, Capability, CAPABILITY_ALIASES, PREPROCESSOR_STEMS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk serialisation of an artifact, decides which backend loads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactFormat {
    /// ONNX graph (`.onnx`)
    Onnx,
    /// Keras HDF5 / `.keras` archive
    Keras,
    /// TensorFlow SavedModel directory (`saved_model.pb` inside)
    SavedModel,
    /// PyTorch checkpoint (`.pt` / `.pth`)
    Torch,
    /// Python pickle (`.pkl`)
    Pickle,
    /// joblib dump (`.joblib`)
    Joblib,
    /// `labels.json`
    LabelJson,
    /// `classes.txt` / `labels.txt`
    LabelText,
}

impl ArtifactFormat {
    /// Formats that need the embedded Python runtime to load.
    pub fn needs_python(&self) -> bool {
        matches!(
            self,
            Self::Keras | Self::SavedModel | Self::Torch | Self::Pickle | Self::Joblib
        )
    }
}

// File names recognised as label lists
const LABEL_JSON_NAMES: &[&str] = &["labels.json"];
const LABEL_TEXT_NAMES: &[&str] = &["classes.txt", "labels.txt"];

// Marker file of a TensorFlow SavedModel directory
pub(crate) const SAVED_MODEL_MARKER: &str = "saved_model.pb";

/// One recognised file (or SavedModel directory).
///
/// Immutable; discarded once the registry has attempted to load it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub format: ArtifactFormat,
}

impl ArtifactDescriptor {
    /// Lowercase file stem used for alias routing.
    pub fn stem(&self) -> String {
        let stem = match self.format {
            // The directory name identifies a SavedModel
            ArtifactFormat::SavedModel => self.path.file_name(),
            _ => self.path.file_stem(),
        };
        stem.map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Key used to detect duplicates across directories.
    pub fn name_key(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Capability slot this artifact routes to, if any.
    ///
    /// Preprocessors and label lists are shared resources and never occupy
    /// a slot.
    pub fn capability(&self) -> Option<Capability> {
        match self.kind {
            ArtifactKind::ImageClassifier | ArtifactKind::TabularModel => {
                capability_for(self.kind, &self.stem())
            }
            ArtifactKind::Preprocessor | ArtifactKind::LabelList => None,
        }
    }
}

/// Classify a file by name and suffix.
///
/// Returns `None` for anything that is not a recognised artifact. A
/// `saved_model.pb` yields a descriptor for its parent directory.
pub fn classify(path: &Path) -> Option<ArtifactDescriptor> {
    let file_name = path.file_name()?.to_string_lossy().to_lowercase();

    if file_name == SAVED_MODEL_MARKER {
        let dir = path.parent()?;
        return Some(ArtifactDescriptor {
            path: dir.to_path_buf(),
            kind: ArtifactKind::ImageClassifier,
            format: ArtifactFormat::SavedModel,
        });
    }
    if LABEL_JSON_NAMES.contains(&file_name.as_str()) {
        return Some(descriptor(path, ArtifactKind::LabelList, ArtifactFormat::LabelJson));
    }
    if LABEL_TEXT_NAMES.contains(&file_name.as_str()) {
        return Some(descriptor(path, ArtifactKind::LabelList, ArtifactFormat::LabelText));
    }

    let stem = path.file_stem()?.to_string_lossy().to_lowercase();
    let ext = path.extension()?.to_string_lossy().to_lowercase();

    let (kind, format) = match ext.as_str() {
        "h5" | "keras" => (ArtifactKind::ImageClassifier, ArtifactFormat::Keras),
        "pt" | "pth" => (ArtifactKind::ImageClassifier, ArtifactFormat::Torch),
        "pkl" => (tabular_or_preprocessor(&stem), ArtifactFormat::Pickle),
        "joblib" => (tabular_or_preprocessor(&stem), ArtifactFormat::Joblib),
        "onnx" => {
            let kind = if is_preprocessor_stem(&stem) {
                ArtifactKind::Preprocessor
            } else if matches_image_alias(&stem) {
                ArtifactKind::ImageClassifier
            } else {
                ArtifactKind::TabularModel
            };
            (kind, ArtifactFormat::Onnx)
        }
        _ => return None,
    };

    Some(descriptor(path, kind, format))
}

fn descriptor(path: &Path, kind: ArtifactKind, format: ArtifactFormat) -> ArtifactDescriptor {
    ArtifactDescriptor {
        path: path.to_path_buf(),
        kind,
        format,
    }
}

fn tabular_or_preprocessor(stem: &str) -> ArtifactKind {
    if is_preprocessor_stem(stem) {
        ArtifactKind::Preprocessor
    } else {
        ArtifactKind::TabularModel
    }
}

fn is_preprocessor_stem(stem: &str) -> bool {
    PREPROCESSOR_STEMS.contains(&stem) || stem.starts_with("preprocessor")
}

fn matches_image_alias(stem: &str) -> bool {
    CAPABILITY_ALIASES
        .iter()
        .filter(|(cap, _)| cap.artifact_kind() == ArtifactKind::ImageClassifier)
        .any(|(_, aliases)| aliases.iter().any(|alias| stem.contains(alias)))
}
