//! In-place rewrite bookkeeping for transcode runs.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Suffix appended to the source while ffmpeg writes the replacement.
pub const ORIGINAL_SUFFIX: &str = "original";

/// Sidecar workspace for rewriting a file in place.
///
/// The source is renamed to `<file>.original` and ffmpeg reads from there
/// while writing `<stem>.mp4` next to it. On success the sidecar is deleted;
/// on failure the partial output is removed and the original name restored.
///
/// # Example
///
/// ```no_run
/// use debridflow_av::SidecarWorkspace;
///
/// let workspace = SidecarWorkspace::begin("/staging/Movie.mkv")?;
/// // run ffmpeg from workspace.original() into workspace.output()
/// let output = workspace.commit()?;
/// assert_eq!(output.extension().unwrap(), "mp4");
/// # Ok::<(), debridflow_av::Error>(())
/// ```
#[derive(Debug)]
pub struct SidecarWorkspace {
    source: PathBuf,
    original: PathBuf,
    output: PathBuf,
}

impl SidecarWorkspace {
    /// Rename the source aside and prepare the output path.
    ///
    /// # Errors
    ///
    /// Fails without touching anything if the source has no file name, and
    /// with [`Error::Workspace`] if the rename fails.
    pub fn begin<P: AsRef<Path>>(source: P) -> Result<Self> {
        let source = source.as_ref().to_path_buf();
        let original = sidecar_path(&source)?;
        let output = output_path_for(&source)?;

        std::fs::rename(&source, &original).map_err(|e| {
            Error::Workspace(format!(
                "Failed to rename {:?} to {:?}: {}",
                source, original, e
            ))
        })?;

        #[cfg(feature = "tracing")]
        tracing::debug!("Renamed {:?} to {:?}", source, original);

        Ok(Self {
            source,
            original,
            output,
        })
    }

    /// Path the untouched source now lives at.
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Path the rewritten file must be written to.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Path the source had before the rename.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Keep the rewritten file and delete the sidecar.
    pub fn commit(self) -> Result<PathBuf> {
        if !self.output.exists() {
            let missing = self.output.clone();
            self.rollback()?;
            return Err(Error::Workspace(format!(
                "Output file does not exist: {:?}",
                missing
            )));
        }

        std::fs::remove_file(&self.original).map_err(|e| {
            Error::Workspace(format!("Failed to remove {:?}: {}", self.original, e))
        })?;

        Ok(self.output)
    }

    /// Discard any partial output and restore the source name.
    pub fn rollback(self) -> Result<()> {
        if self.output.exists() {
            let _ = std::fs::remove_file(&self.output);
        }

        std::fs::rename(&self.original, &self.source).map_err(|e| {
            Error::Workspace(format!(
                "Failed to restore {:?} from {:?}: {}",
                self.source, self.original, e
            ))
        })?;

        #[cfg(feature = "tracing")]
        tracing::warn!("Restored {:?} after a failed rewrite", self.source);

        Ok(())
    }
}

/// `<file>.original` for a given source path.
pub fn sidecar_path(source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("Invalid input file path: {:?}", source)))?;

    let mut sidecar = name.to_os_string();
    sidecar.push(".");
    sidecar.push(ORIGINAL_SUFFIX);
    Ok(source.with_file_name(sidecar))
}

/// `<dir>/<stem>.mp4` for a given source path.
pub fn output_path_for(source: &Path) -> Result<PathBuf> {
    if source.file_stem().is_none() {
        return Err(Error::InvalidInput(format!(
            "Invalid input file path: {:?}",
            source
        )));
    }
    Ok(source.with_extension("mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths() {
        let src = Path::new("/staging/Movie (2023).mkv");
        assert_eq!(
            sidecar_path(src).unwrap(),
            PathBuf::from("/staging/Movie (2023).mkv.original")
        );
        assert_eq!(
            output_path_for(src).unwrap(),
            PathBuf::from("/staging/Movie (2023).mp4")
        );
    }

    #[test]
    fn test_commit_removes_sidecar() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.mkv");
        std::fs::write(&src, b"mkv").unwrap();

        let ws = SidecarWorkspace::begin(&src).unwrap();
        assert!(!src.exists());
        assert!(ws.original().exists());

        std::fs::write(ws.output(), b"mp4").unwrap();
        let out = ws.commit().unwrap();

        assert_eq!(out, dir.path().join("a.mp4"));
        assert!(out.exists());
        assert!(!dir.path().join("a.mkv.original").exists());
    }

    #[test]
    fn test_rollback_restores_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.mp4");
        std::fs::write(&src, b"source").unwrap();

        let ws = SidecarWorkspace::begin(&src).unwrap();
        std::fs::write(ws.output(), b"partial").unwrap();
        ws.rollback().unwrap();

        assert_eq!(std::fs::read(&src).unwrap(), b"source");
        assert!(!dir.path().join("a.mp4.original").exists());
    }

    #[test]
    fn test_commit_without_output_rolls_back() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.mkv");
        std::fs::write(&src, b"mkv").unwrap();

        let ws = SidecarWorkspace::begin(&src).unwrap();
        assert!(ws.commit().is_err());
        assert!(src.exists());
    }

    #[test]
    fn test_begin_missing_source_fails() {
        let dir = tempdir().unwrap();
        let err = SidecarWorkspace::begin(dir.path().join("missing.mkv")).unwrap_err();
        assert!(matches!(err, Error::Workspace(_)));
    }
}
