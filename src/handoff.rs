//! Job handoff between the PVR grab hook and the import run.
//!
//! On grab, the PVR invokes `debridflow grab` with its event in environment
//! variables. The item id, category and upload destination are written to
//! `<handoff dir>/<lowercase download id>.json`, where the later `import`
//! picks them up by download id.

use crate::config::UploadConfig;
use anyhow::{Context, Result};
use debridflow_common::Category;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted record of a grabbed release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    /// Torrent hash the PVR knows the download by.
    #[serde(rename = "torrentHash")]
    pub download_id: String,
    /// Radarr movie id or Sonarr series id.
    pub id: i64,
    pub category: Category,
    /// rclone destination, e.g. `remote:Movies/Title (2023)/`.
    #[serde(rename = "rclonePath")]
    pub destination: String,
}

impl Handoff {
    /// `<dir>/<lowercase download id>.json`
    pub fn path_for(dir: &Path, download_id: &str) -> PathBuf {
        dir.join(format!("{}.json", download_id.to_lowercase()))
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create handoff directory: {:?}", dir))?;

        let path = Self::path_for(dir, &self.download_id);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write handoff file: {:?}", path))?;

        Ok(path)
    }

    pub fn load(dir: &Path, download_id: &str) -> Result<Self> {
        Self::read(&Self::path_for(dir, download_id))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read handoff file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse handoff file: {:?}", path))
    }

    pub fn remove(dir: &Path, download_id: &str) -> Result<()> {
        let path = Self::path_for(dir, download_id);
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove handoff file: {:?}", path))
    }
}

/// A PVR "On Grab" event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabEvent {
    pub category: Category,
    pub item_id: i64,
    pub title: String,
    pub year: Option<String>,
    pub season: Option<String>,
    pub download_id: String,
}

impl GrabEvent {
    /// Build the event from PVR custom-script variables.
    ///
    /// Returns `Ok(None)` when no download id is present, which is how the
    /// PVRs call the script when testing the connection.
    pub fn from_vars<F>(var: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let (category, download_id) = match non_empty("radarr_download_id") {
            Some(id) => (Category::Movie, id),
            None => match non_empty("sonarr_download_id") {
                Some(id) => (Category::Series, id),
                None => return Ok(None),
            },
        };

        let (id_var, title_var) = match category {
            Category::Movie => ("radarr_movie_id", "radarr_movie_title"),
            Category::Series => ("sonarr_series_id", "sonarr_series_title"),
        };

        let item_id = non_empty(id_var)
            .with_context(|| format!("{} is not set", id_var))?
            .trim()
            .parse::<i64>()
            .with_context(|| format!("{} is not a number", id_var))?;

        let title = non_empty(title_var).with_context(|| format!("{} is not set", title_var))?;

        Ok(Some(Self {
            category,
            item_id,
            title,
            year: non_empty("radarr_movie_year"),
            season: non_empty("sonarr_release_seasonnumber"),
            download_id,
        }))
    }

    pub fn from_env() -> Result<Option<Self>> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// rclone destination of the release.
    pub fn destination(&self, upload: &UploadConfig) -> String {
        match self.category {
            Category::Movie => match &self.year {
                Some(year) => format!(
                    "{}:{}/{} ({})/",
                    upload.remote, upload.movies_dir, self.title, year
                ),
                None => format!("{}:{}/{}/", upload.remote, upload.movies_dir, self.title),
            },
            Category::Series => format!(
                "{}:{}/{}/Season {}/",
                upload.remote,
                upload.series_dir,
                self.title,
                self.season.as_deref().unwrap_or("1")
            ),
        }
    }

    pub fn to_handoff(&self, upload: &UploadConfig) -> Handoff {
        Handoff {
            download_id: self.download_id.clone(),
            id: self.item_id,
            category: self.category,
            destination: self.destination(upload),
        }
    }
}
