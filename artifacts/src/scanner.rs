//! Directory traversal.
//!
//! Directories are searched in the order given and each one is walked
//! recursively in sorted order, so the result is deterministic for a given
//! tree. The first artifact seen with a given (case-insensitive) file name
//! wins; later ones are skipped, which is what gives earlier directories
//! precedence over later ones.

use crate::descriptor::{classify, ArtifactDescriptor};
use crate::error::{Result, ScanError};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

// Guards against symlink cycles
const MAX_DEPTH: usize = 8;

/// Everything a scan found, including the directories it could not use.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Recognised artifacts, in discovery order
    pub descriptors: Vec<ArtifactDescriptor>,
    /// Directories that existed and could be listed
    pub readable_dirs: Vec<PathBuf>,
    /// Directories that do not exist (treated as empty)
    pub missing_dirs: Vec<PathBuf>,
    /// Artifacts skipped because an earlier one had the same name
    pub duplicates: Vec<PathBuf>,
    /// Non-fatal traversal errors
    pub errors: Vec<ScanError>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Discover artifacts under `dirs`.
pub fn scan<P: AsRef<Path>>(dirs: &[P]) -> Vec<ArtifactDescriptor> {
    scan_report(dirs).descriptors
}

/// Discover artifacts under `dirs`, keeping the per-directory bookkeeping.
///
/// Never fails: a missing directory is recorded and treated as empty, an
/// unreadable subdirectory is recorded and skipped.
pub fn scan_report<P: AsRef<Path>>(dirs: &[P]) -> ScanReport {
    let mut report = ScanReport::default();
    let mut seen: HashSet<String> = HashSet::new();

    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!("Model directory {:?} not found, skipping", dir);
            report.missing_dirs.push(dir.to_path_buf());
            continue;
        }

        let mut found = Vec::new();
        if let Err(e) = walk(dir, 0, &mut found, &mut report.errors) {
            warn!("Cannot read model directory {:?}: {}", dir, e);
            report.errors.push(e);
            report.missing_dirs.push(dir.to_path_buf());
            continue;
        }
        report.readable_dirs.push(dir.to_path_buf());

        for descriptor in found {
            if seen.insert(descriptor.name_key()) {
                debug!("Found {} artifact {:?}", descriptor.kind, descriptor.path);
                report.descriptors.push(descriptor);
            } else {
                debug!(
                    "Skipping duplicate artifact {:?} (an earlier directory provides it)",
                    descriptor.path
                );
                report.duplicates.push(descriptor.path);
            }
        }
    }

    info!(
        "Scanned {} director{} ({} missing): {} artifacts, {} duplicates skipped",
        report.readable_dirs.len(),
        if report.readable_dirs.len() == 1 { "y" } else { "ies" },
        report.missing_dirs.len(),
        report.descriptors.len(),
        report.duplicates.len()
    );
    report
}

fn walk(
    dir: &Path,
    depth: usize,
    found: &mut Vec<ArtifactDescriptor>,
    errors: &mut Vec<ScanError>,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| ScanError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| !is_hidden(path))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if depth + 1 >= MAX_DEPTH {
                debug!("Not descending into {:?}: too deep", path);
                continue;
            }
            if let Err(e) = walk(&path, depth + 1, found, errors) {
                warn!("Skipping unreadable directory {:?}: {}", path, e);
                errors.push(e);
            }
        } else if let Some(descriptor) = classify(&path) {
            found.push(descriptor);
        }
    }
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
