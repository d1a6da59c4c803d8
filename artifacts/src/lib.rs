//! Artifact discovery.
//!
//! Walks the configured model directories in order and classifies every
//! recognised file into an [`ArtifactDescriptor`]. Nothing is loaded here;
//! the registry decides what to do with each descriptor.

pub mod descriptor;
pub mod error;
pub mod labels;
pub mod scanner;

pub use descriptor::{classify, ArtifactDescriptor, ArtifactFormat};
pub use error::{Result, ScanError};
pub use labels::LabelList;
pub use scanner::{scan, scan_report, ScanReport};
