use serde::Deserialize;
use std::fmt;

/// Response of `addMagnet` / `addTorrent`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddedTorrent {
    pub id: String,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Response of `torrents/info/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub hash: String,
    pub status: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub files: Vec<TorrentFile>,
    #[serde(default)]
    pub links: Vec<String>,
}

impl fmt::Display for TorrentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0}%)", self.status, self.progress)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TorrentFile {
    pub id: u64,
    pub path: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub selected: u8,
}

/// Response of `unrestrict/link`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrestrictedLink {
    #[serde(default)]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub filesize: u64,
    pub download: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}
