//! Staging directory helpers.

use anyhow::{Context, Result};
use debridflow_common::paths::{is_deliverable_file, is_transcodable_file};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Characters the PVRs refuse in folder names.
const UNSAFE_CHARS: &[char] = &[':', '/', '\\', '*', '?', '"', '<', '>', '|'];

/// Directory a release is downloaded into.
pub fn release_dir(staging: &Path, release: &str) -> PathBuf {
    let name: String = release
        .chars()
        .filter(|c| !UNSAFE_CHARS.contains(c))
        .collect();
    let name = name.trim().trim_matches('.');
    if name.is_empty() {
        staging.join("release")
    } else {
        staging.join(name)
    }
}

/// Video files directly inside `dir`, sorted by name.
pub fn scan_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
        if entry.file_type().is_file() && is_transcodable_file(entry.path()) {
            videos.push(entry.into_path());
        }
    }

    videos.sort();
    Ok(videos)
}

/// Delete everything in `dir` except top-level `.mp4` and `.vtt` files
/// and the files listed in `retain`.
///
/// Returns the remaining deliverables, sorted by name. Retained files are
/// left in place but not returned.
pub fn prune(dir: &Path, retain: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut kept = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
        let path = entry.path();

        if retain.iter().any(|r| r == path) {
            tracing::debug!("Leaving {:?} in place", path);
        } else if entry.file_type().is_dir() {
            std::fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove directory: {:?}", path))?;
            tracing::debug!("Removed directory {:?}", path);
        } else if is_deliverable_file(path) {
            kept.push(entry.into_path());
        } else {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove file: {:?}", path))?;
            tracing::debug!("Removed {:?}", path);
        }
    }

    kept.sort();
    Ok(kept)
}
