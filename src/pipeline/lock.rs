//! Cross-process transcode lock.
//!
//! The download client may start several imports at once. Only one of them
//! runs ffmpeg at a time; the others wait on an advisory lock on
//! `<handoff dir>/ffmpeg.lock`.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "ffmpeg.lock";

/// Held for as long as this process may run ffmpeg.
#[derive(Debug)]
pub struct TranscodeLock {
    file: File,
    path: PathBuf,
}

impl TranscodeLock {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(LOCK_FILE)
    }

    /// Wait until no other process holds the lock, then take it.
    pub async fn acquire(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create lock directory: {:?}", dir))?;

        let path = Self::path_in(dir);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {:?}", path))?;

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            if file.try_lock_exclusive().is_err() {
                tracing::info!("ffmpeg is in use by another import, waiting");
                file.lock_exclusive()?;
            }
            Ok(file)
        })
        .await?
        .with_context(|| format!("Failed to lock {:?}", path))?;

        tracing::debug!("Acquired transcode lock {:?}", path);
        Ok(Self { file, path })
    }
}

impl Drop for TranscodeLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release {:?}: {}", self.path, e);
        }
    }
}
