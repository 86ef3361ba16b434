//! External tool detection and management.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Resolved paths of the media tools used by probing and transcoding.
#[derive(Debug, Clone)]
pub struct Tools {
    /// ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// ffprobe executable.
    pub ffprobe: PathBuf,
}

impl Tools {
    /// Resolve ffmpeg and ffprobe, preferring configured paths over PATH lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if either tool cannot be located.
    pub fn discover(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> Result<Self> {
        Ok(Self {
            ffmpeg: get_tool_path("ffmpeg", ffmpeg)?,
            ffprobe: get_tool_path("ffprobe", ffprobe)?,
        })
    }

    /// Use the given paths as-is, without checking that they exist.
    pub fn from_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

/// Check if a tool is available using the given version argument.
///
/// # Example
///
/// ```no_run
/// use debridflow_av::tools::check_tool_with_arg;
///
/// let info = check_tool_with_arg("rclone", "version");
/// if info.available {
///     println!("rclone version: {:?}", info.version);
/// }
/// ```
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let result = Command::new(name).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(name).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool the pipeline shells out to.
///
/// Returns information about ffmpeg, ffprobe and rclone.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![
        check_tool_with_arg("ffmpeg", "-version"),
        check_tool_with_arg("ffprobe", "-version"),
        check_tool_with_arg("rclone", "version"),
    ]
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    require_tool(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tool_not_found() {
        let info = check_tool_with_arg("nonexistent_tool_12345", "--version");
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn test_get_tool_path_prefers_existing_config_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = get_tool_path("nonexistent_tool_12345", Some(file.path())).unwrap();
        assert_eq!(path, file.path());
    }

    #[test]
    fn test_get_tool_path_missing() {
        let err = get_tool_path(
            "nonexistent_tool_12345",
            Some(Path::new("/definitely/not/here")),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
