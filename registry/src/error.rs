use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another load/reload holds the registry
    #[error("A registry reload is already in progress")]
    ReloadInProgress,

    /// No configured directory was readable and nothing was found.
    ///
    /// The registry still publishes an empty state: every capability is
    /// served by its fallback.
    #[error("No readable model directory among {dirs:?}; all capabilities will use fallbacks")]
    NoArtifactSources { dirs: Vec<PathBuf> },
}
