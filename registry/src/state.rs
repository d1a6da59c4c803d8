//! Immutable registry snapshots.
//!
//! A [`RegistryState`] is built once per load and never mutated after it is
//! published; a reload builds a fresh one and swaps it in wholesale.

use chrono::{DateTime, Utc};
use common::{ArtifactKind, ArtifactLoadError, Capability, ModelHandle, TransformHandle};
use serde::Serialize;
use soilsense_artifacts::LabelList;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of loading one artifact.
#[derive(Clone)]
pub enum ModelStatus {
    Ready(ModelHandle),
    Failed(ArtifactLoadError),
}

impl fmt::Debug for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(handle) => write!(f, "Ready({})", handle.backend()),
            Self::Failed(err) => write!(f, "Failed({err})"),
        }
    }
}

/// One loaded (or failed) model artifact.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Slot this model serves; `None` for unrouted artifacts
    pub capability: Option<Capability>,
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub status: ModelStatus,
}

impl LoadedModel {
    pub fn is_ready(&self) -> bool {
        matches!(self.status, ModelStatus::Ready(_))
    }

    pub fn handle(&self) -> Option<&ModelHandle> {
        match &self.status {
            ModelStatus::Ready(handle) => Some(handle),
            ModelStatus::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ArtifactLoadError> {
        match &self.status {
            ModelStatus::Ready(_) => None,
            ModelStatus::Failed(err) => Some(err),
        }
    }

    pub fn backend(&self) -> Option<&str> {
        self.handle().map(|h| h.backend())
    }
}

/// Per-capability status, comparable across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SlotStatus {
    Ready,
    Failed(String),
    Absent,
}

/// Process-wide snapshot of everything the registry loaded.
pub struct RegistryState {
    generation: u64,
    loaded_at: DateTime<Utc>,
    directories: Vec<PathBuf>,
    readable_dirs: Vec<PathBuf>,
    missing_dirs: Vec<PathBuf>,
    discovered: Vec<PathBuf>,
    slots: HashMap<Capability, LoadedModel>,
    unrouted: Vec<LoadedModel>,
    preprocessor: Option<(PathBuf, TransformHandle)>,
    labels: Option<(PathBuf, Arc<LabelList>)>,
    errors: BTreeMap<PathBuf, String>,
}

impl fmt::Debug for RegistryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryState")
            .field("generation", &self.generation)
            .field("slots", &self.capability_status())
            .field("unrouted", &self.unrouted.len())
            .field("preprocessor", &self.preprocessor.as_ref().map(|(p, _)| p))
            .field("labels", &self.labels.as_ref().map(|(p, _)| p))
            .finish()
    }
}

impl RegistryState {
    /// State with nothing loaded: every capability falls back.
    pub fn empty() -> Self {
        StateBuilder::new(0, Vec::new()).build()
    }

    pub fn builder(generation: u64, directories: Vec<PathBuf>) -> StateBuilder {
        StateBuilder::new(generation, directories)
    }

    /// Model occupying a capability slot (ready or failed).
    pub fn get(&self, capability: Capability) -> Option<&LoadedModel> {
        self.slots.get(&capability)
    }

    /// Ready model for a capability, skipping failed slots.
    pub fn ready(&self, capability: Capability) -> Option<&ModelHandle> {
        self.get(capability).and_then(LoadedModel::handle)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn readable_dirs(&self) -> &[PathBuf] {
        &self.readable_dirs
    }

    /// Every artifact path the scan found, in discovery order.
    pub fn discovered(&self) -> &[PathBuf] {
        &self.discovered
    }

    pub fn unrouted(&self) -> &[LoadedModel] {
        &self.unrouted
    }

    pub fn preprocessor(&self) -> Option<&TransformHandle> {
        self.preprocessor.as_ref().map(|(_, t)| t)
    }

    pub fn labels(&self) -> Option<&LabelList> {
        self.labels.as_ref().map(|(_, l)| l.as_ref())
    }

    /// Artifact path → load error for every artifact that failed.
    pub fn errors(&self) -> &BTreeMap<PathBuf, String> {
        &self.errors
    }

    /// Status of every capability, including absent ones.
    pub fn capability_status(&self) -> BTreeMap<Capability, SlotStatus> {
        Capability::ALL
            .iter()
            .map(|cap| {
                let status = match self.slots.get(cap) {
                    Some(model) => match &model.status {
                        ModelStatus::Ready(_) => SlotStatus::Ready,
                        ModelStatus::Failed(err) => SlotStatus::Failed(err.to_string()),
                    },
                    None => SlotStatus::Absent,
                };
                (*cap, status)
            })
            .collect()
    }

    /// Whether a model (not a fallback) will serve each capability.
    pub fn model_availability(&self) -> BTreeMap<Capability, bool> {
        Capability::ALL
            .iter()
            .map(|cap| (*cap, self.ready(*cap).is_some()))
            .collect()
    }

    /// Serialisable summary for status endpoints and the CLI.
    pub fn report(&self) -> RegistryReport {
        let capabilities = self
            .capability_status()
            .into_iter()
            .map(|(cap, status)| {
                let slot = self.slots.get(&cap);
                let (status, reason) = match status {
                    SlotStatus::Ready => ("ready", None),
                    SlotStatus::Failed(reason) => ("failed", Some(reason)),
                    SlotStatus::Absent => ("absent", None),
                };
                let entry = CapabilityReport {
                    status,
                    reason,
                    path: slot.map(|m| m.path.clone()),
                    backend: slot.and_then(|m| m.backend()).map(str::to_string),
                };
                (cap, entry)
            })
            .collect();

        RegistryReport {
            generation: self.generation,
            loaded_at: self.loaded_at,
            directories: self.directories.clone(),
            readable_dirs: self.readable_dirs.clone(),
            missing_dirs: self.missing_dirs.clone(),
            artifacts: self.discovered.clone(),
            capabilities,
            unrouted: self
                .unrouted
                .iter()
                .map(|m| UnroutedReport {
                    path: m.path.clone(),
                    kind: m.kind,
                    ready: m.is_ready(),
                })
                .collect(),
            preprocessor: self.preprocessor.as_ref().map(|(p, _)| p.clone()),
            labels: self.labels.as_ref().map(|(p, _)| p.clone()),
            label_count: self.labels().map(LabelList::len).unwrap_or(0),
            errors: self
                .errors
                .iter()
                .map(|(p, e)| (p.display().to_string(), e.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub path: Option<PathBuf>,
    pub backend: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnroutedReport {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
    pub directories: Vec<PathBuf>,
    pub readable_dirs: Vec<PathBuf>,
    pub missing_dirs: Vec<PathBuf>,
    pub artifacts: Vec<PathBuf>,
    pub capabilities: BTreeMap<Capability, CapabilityReport>,
    pub unrouted: Vec<UnroutedReport>,
    pub preprocessor: Option<PathBuf>,
    pub labels: Option<PathBuf>,
    pub label_count: usize,
    pub errors: BTreeMap<String, String>,
}

/// Assembles a [`RegistryState`] while enforcing the slot rules:
/// a ready slot is never replaced, a failed slot yields to a later success,
/// and only the first preprocessor / label list is kept.
pub struct StateBuilder {
    state: RegistryState,
}

impl StateBuilder {
    pub fn new(generation: u64, directories: Vec<PathBuf>) -> Self {
        Self {
            state: RegistryState {
                generation,
                loaded_at: Utc::now(),
                directories,
                readable_dirs: Vec::new(),
                missing_dirs: Vec::new(),
                discovered: Vec::new(),
                slots: HashMap::new(),
                unrouted: Vec::new(),
                preprocessor: None,
                labels: None,
                errors: BTreeMap::new(),
            },
        }
    }

    pub fn scanned(mut self, readable: Vec<PathBuf>, missing: Vec<PathBuf>, discovered: Vec<PathBuf>) -> Self {
        self.state.readable_dirs = readable;
        self.state.missing_dirs = missing;
        self.state.discovered = discovered;
        self
    }

    /// Whether a ready model already occupies `capability`.
    pub fn slot_ready(&self, capability: Capability) -> bool {
        self.state
            .slots
            .get(&capability)
            .map(LoadedModel::is_ready)
            .unwrap_or(false)
    }

    pub fn has_preprocessor(&self) -> bool {
        self.state.preprocessor.is_some()
    }

    pub fn has_labels(&self) -> bool {
        self.state.labels.is_some()
    }

    /// Record a model outcome. Returns `false` if the slot rules rejected it.
    pub fn insert(&mut self, model: LoadedModel) -> bool {
        if let ModelStatus::Failed(err) = &model.status {
            self.state.errors.insert(model.path.clone(), err.to_string());
        }
        match model.capability {
            None => {
                self.state.unrouted.push(model);
                true
            }
            Some(cap) => match self.state.slots.get(&cap) {
                Some(existing) if existing.is_ready() => false,
                Some(_) if !model.is_ready() => false,
                _ => {
                    self.state.slots.insert(cap, model);
                    true
                }
            },
        }
    }

    /// Convenience for a ready, routed model.
    pub fn model(mut self, capability: Capability, path: impl AsRef<Path>, handle: ModelHandle) -> Self {
        self.insert(LoadedModel {
            capability: Some(capability),
            kind: capability.artifact_kind(),
            path: path.as_ref().to_path_buf(),
            status: ModelStatus::Ready(handle),
        });
        self
    }

    /// Convenience for a failed, routed model.
    pub fn failed(mut self, capability: Capability, path: impl AsRef<Path>, err: ArtifactLoadError) -> Self {
        self.insert(LoadedModel {
            capability: Some(capability),
            kind: capability.artifact_kind(),
            path: path.as_ref().to_path_buf(),
            status: ModelStatus::Failed(err),
        });
        self
    }

    pub fn set_preprocessor(&mut self, path: PathBuf, transform: TransformHandle) -> bool {
        if self.state.preprocessor.is_some() {
            return false;
        }
        self.state.preprocessor = Some((path, transform));
        true
    }

    pub fn set_labels(&mut self, path: PathBuf, labels: LabelList) -> bool {
        if self.state.labels.is_some() {
            return false;
        }
        self.state.labels = Some((path, Arc::new(labels)));
        true
    }

    pub fn preprocessor(mut self, path: impl AsRef<Path>, transform: TransformHandle) -> Self {
        self.set_preprocessor(path.as_ref().to_path_buf(), transform);
        self
    }

    pub fn labels(mut self, path: impl AsRef<Path>, labels: LabelList) -> Self {
        self.set_labels(path.as_ref().to_path_buf(), labels);
        self
    }

    /// Record a failure for an artifact that occupies no slot.
    pub fn record_error(&mut self, path: PathBuf, err: &ArtifactLoadError) {
        self.state.errors.insert(path, err.to_string());
    }

    pub fn build(self) -> RegistryState {
        self.state
    }
}
