//! The model registry: discovery, loading and snapshot publication.

use crate::error::{RegistryError, Result};
use crate::loader::{ArtifactLoader, DefaultLoader, LoadedArtifact};
use crate::state::{LoadedModel, ModelStatus, RegistryState, StateBuilder};
use arc_swap::ArcSwap;
use common::{ArtifactKind, ArtifactLoadError, Capability, InputKind, ModelHandle};
use log::{debug, info, warn};
use parking_lot::Mutex;
use soilsense_artifacts::{scan_report, ArtifactDescriptor};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryPhase {
    /// Nothing loaded yet
    Uninitialized,
    /// A load or reload is running (readers still see the previous snapshot)
    Loading,
    /// A snapshot has been published
    Ready,
}

/// Owns the loaded models keyed by capability.
///
/// Readers take a snapshot with [`ModelRegistry::snapshot`] and keep it for
/// the duration of a call; a reload publishes a new snapshot atomically and
/// never disturbs calls already holding the old one. Loads are serialised:
/// a second concurrent load is rejected with
/// [`RegistryError::ReloadInProgress`].
pub struct ModelRegistry {
    state: ArcSwap<RegistryState>,
    loader: Arc<dyn ArtifactLoader>,
    reload_lock: Mutex<()>,
    initialized: AtomicBool,
    generation: AtomicU64,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Registry using the compiled-in backends.
    pub fn new() -> Self {
        Self::with_loader(Arc::new(DefaultLoader::new()))
    }

    pub fn with_loader(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            state: ArcSwap::from_pointee(RegistryState::empty()),
            loader,
            reload_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Registry serving an already-built state.
    pub fn from_state(state: RegistryState) -> Self {
        let registry = Self::new();
        registry.generation.store(state.generation(), Ordering::SeqCst);
        registry.state.store(Arc::new(state));
        registry.initialized.store(true, Ordering::SeqCst);
        registry
    }

    /// Initial load. Same semantics as [`reload`](Self::reload).
    pub fn load<P: AsRef<Path>>(&self, directories: &[P]) -> Result<Arc<RegistryState>> {
        self.reload(directories)
    }

    /// Discover and load everything under `directories`, then publish it.
    ///
    /// Per-artifact failures are recorded in the new state and never abort
    /// the load. When no directory is readable and nothing was found, the
    /// (empty) state is still published and
    /// [`RegistryError::NoArtifactSources`] is returned.
    pub fn reload<P: AsRef<Path>>(&self, directories: &[P]) -> Result<Arc<RegistryState>> {
        let _guard = self
            .reload_lock
            .try_lock()
            .ok_or(RegistryError::ReloadInProgress)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let dirs: Vec<PathBuf> = directories.iter().map(|d| d.as_ref().to_path_buf()).collect();
        info!("Registry load #{} starting over {:?}", generation, dirs);
        let started = Instant::now();

        let state = Arc::new(build_state(generation, dirs.clone(), self.loader.as_ref()));
        let no_sources = state.readable_dirs().is_empty() && state.discovered().is_empty();

        self.state.store(Arc::clone(&state));
        self.initialized.store(true, Ordering::SeqCst);

        let ready = state
            .model_availability()
            .values()
            .filter(|ready| **ready)
            .count();
        info!(
            "Registry load #{} finished in {:?}: {}/{} capabilities backed by models, {} load errors",
            generation,
            started.elapsed(),
            ready,
            Capability::ALL.len(),
            state.errors().len()
        );

        if no_sources {
            warn!("No readable model directory among {:?}; serving fallbacks only", dirs);
            return Err(RegistryError::NoArtifactSources { dirs });
        }
        Ok(state)
    }

    /// Current snapshot. Cheap; callers should hold it for a whole call.
    pub fn snapshot(&self) -> Arc<RegistryState> {
        self.state.load_full()
    }

    /// Model in a capability slot of the current snapshot.
    pub fn get(&self, capability: Capability) -> Option<LoadedModel> {
        self.state.load().get(capability).cloned()
    }

    pub fn phase(&self) -> RegistryPhase {
        if self.reload_lock.is_locked() {
            RegistryPhase::Loading
        } else if self.initialized.load(Ordering::SeqCst) {
            RegistryPhase::Ready
        } else {
            RegistryPhase::Uninitialized
        }
    }
}

fn build_state(generation: u64, dirs: Vec<PathBuf>, loader: &dyn ArtifactLoader) -> RegistryState {
    let scan = scan_report(&dirs);
    let discovered: Vec<PathBuf> = scan.descriptors.iter().map(|d| d.path.clone()).collect();
    let mut builder = StateBuilder::new(generation, dirs)
        .scanned(scan.readable_dirs, scan.missing_dirs, discovered);

    for descriptor in &scan.descriptors {
        load_one(&mut builder, descriptor, loader);
    }
    builder.build()
}

/// Load through `loader`, recording a backend panic as a load failure.
fn guarded_load(
    loader: &dyn ArtifactLoader,
    descriptor: &ArtifactDescriptor,
) -> std::result::Result<LoadedArtifact, ArtifactLoadError> {
    catch_unwind(AssertUnwindSafe(|| loader.load(descriptor))).unwrap_or_else(|payload| {
        Err(ArtifactLoadError::backend(
            &descriptor.path,
            format!("loader panicked: {}", panic_message(&*payload)),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn load_one(builder: &mut StateBuilder, descriptor: &ArtifactDescriptor, loader: &dyn ArtifactLoader) {
    let path = &descriptor.path;
    match descriptor.kind {
        ArtifactKind::LabelList if builder.has_labels() => {
            debug!("Ignoring label list {:?}: one is already loaded", path);
        }
        ArtifactKind::Preprocessor if builder.has_preprocessor() => {
            debug!("Ignoring preprocessor {:?}: one is already loaded", path);
        }
        ArtifactKind::LabelList | ArtifactKind::Preprocessor => match guarded_load(loader, descriptor) {
            Ok(LoadedArtifact::Labels(labels)) => {
                info!("Loaded {} labels from {:?}", labels.len(), path);
                builder.set_labels(path.clone(), labels);
            }
            Ok(LoadedArtifact::Transform(transform)) => {
                info!("Loaded {} preprocessor from {:?}", transform.backend(), path);
                builder.set_preprocessor(path.clone(), transform);
            }
            Ok(other) => {
                let err = ArtifactLoadError::malformed(path, format!("unexpected {other:?}"));
                warn!("Failed to load {:?}: {}", path, err);
                builder.record_error(path.clone(), &err);
            }
            Err(err) => {
                warn!("Failed to load {} {:?}: {}", descriptor.kind, path, err);
                builder.record_error(path.clone(), &err);
            }
        },
        ArtifactKind::ImageClassifier | ArtifactKind::TabularModel => {
            let capability = descriptor.capability();
            if let Some(cap) = capability {
                if builder.slot_ready(cap) {
                    debug!("Skipping {:?}: {} already served", path, cap);
                    return;
                }
            }

            let status = match guarded_load(loader, descriptor).and_then(|a| check_model(descriptor, a)) {
                Ok(handle) => {
                    match capability {
                        Some(cap) => info!("Loaded {} model for {} from {:?}", handle.backend(), cap, path),
                        None => info!("Loaded unrouted {} model from {:?}", handle.backend(), path),
                    }
                    ModelStatus::Ready(handle)
                }
                Err(err) => {
                    warn!("Failed to load {} {:?}: {}", descriptor.kind, path, err);
                    ModelStatus::Failed(err)
                }
            };

            builder.insert(LoadedModel {
                capability,
                kind: descriptor.kind,
                path: path.clone(),
                status,
            });
        }
    }
}

/// A model artifact must load as a model whose input kind matches its kind.
fn check_model(
    descriptor: &ArtifactDescriptor,
    artifact: LoadedArtifact,
) -> std::result::Result<ModelHandle, ArtifactLoadError> {
    let LoadedArtifact::Model(handle) = artifact else {
        return Err(ArtifactLoadError::malformed(
            &descriptor.path,
            format!("expected a model, got {artifact:?}"),
        ));
    };
    let expected = match descriptor.kind {
        ArtifactKind::ImageClassifier => InputKind::Image,
        _ => InputKind::Tabular,
    };
    if handle.input_kind() != expected {
        return Err(ArtifactLoadError::malformed(
            &descriptor.path,
            format!("model takes {} input, {} expected", handle.input_kind(), expected),
        ));
    }
    Ok(handle)
}
