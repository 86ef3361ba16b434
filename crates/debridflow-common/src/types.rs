//! Core type definitions shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Library category of a release.
///
/// The serialized names are the download-client categories the PVRs assign
/// on grab, so handoff files stay readable by older tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// A movie managed by Radarr.
    #[serde(rename = "radarr", alias = "movie")]
    Movie,
    /// A series managed by Sonarr.
    #[serde(rename = "tv-sonarr", alias = "series")]
    Series,
}

impl Category {
    /// Name of the PVR responsible for this category.
    pub fn pvr_name(&self) -> &'static str {
        match self {
            Self::Movie => "radarr",
            Self::Series => "sonarr",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Series => write!(f, "series"),
        }
    }
}
