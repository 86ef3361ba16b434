//! Path utilities for detecting file types by extension.
//!
//! The pipeline filters files at three points: when selecting files inside a
//! torrent, when picking staged downloads to transcode, and when pruning the
//! staging directory before upload. Each point has its own extension list.

use std::path::Path;

/// Video extensions worth fetching from a torrent.
const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "mov", "avi", "webm"];

/// Staged video extensions the transcoder accepts.
const TRANSCODABLE_EXTENSIONS: &[&str] = &["mkv", "mp4"];

/// Extensions that survive pruning of the staging directory.
const DELIVERABLE_EXTENSIONS: &[&str] = &["mp4", "vtt"];

fn has_extension(path: &Path, list: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| list.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use debridflow_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/Show/S01E01.webm")));
/// assert!(!is_video_file(Path::new("sample.nfo")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Check if a staged file should go through the transcoder.
pub fn is_transcodable_file(path: &Path) -> bool {
    has_extension(path, TRANSCODABLE_EXTENSIONS)
}

/// Check if a staged file should be uploaded to the library.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use debridflow_common::paths::is_deliverable_file;
///
/// assert!(is_deliverable_file(Path::new("movie.mp4")));
/// assert!(is_deliverable_file(Path::new("movie.eng.vtt")));
/// assert!(!is_deliverable_file(Path::new("movie.mkv.original")));
/// ```
pub fn is_deliverable_file(path: &Path) -> bool {
    has_extension(path, DELIVERABLE_EXTENSIONS)
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}
