//! Model registry.
//!
//! Turns the artifacts found by the scanner into ready-to-use models keyed
//! by capability, recording per-artifact failures instead of aborting.
//! The loaded set is published as an immutable [`RegistryState`] snapshot
//! that is swapped atomically on reload.

pub mod error;
pub mod loader;
pub mod registry;
pub mod state;

pub use error::{RegistryError, Result};
pub use loader::{ArtifactLoader, DefaultLoader, LoadedArtifact};
pub use registry::{ModelRegistry, RegistryPhase};
pub use state::{
    CapabilityReport, LoadedModel, ModelStatus, RegistryReport, RegistryState, SlotStatus,
    StateBuilder,
};
