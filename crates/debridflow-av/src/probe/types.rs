//! Stream descriptor types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of an elementary stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Video stream.
    Video,
    /// Audio stream.
    Audio,
    /// Subtitle stream.
    Subtitle,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// Snapshot of one stream in a probed file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Absolute stream index inside the container.
    pub index: u32,
    /// Stream kind.
    pub kind: StreamKind,
    /// Codec name as reported by ffprobe (e.g. "h264", "aac", "subrip").
    pub codec: String,
    /// Channel count, audio only.
    pub channels: Option<u32>,
    /// Whether the stream carries the `default` disposition.
    pub default: bool,
    /// Whether the stream carries the `forced` disposition.
    pub forced: bool,
    /// Whether the stream carries the `hearing_impaired` disposition.
    pub hearing_impaired: bool,
    /// Language tag (e.g. "eng", "spa").
    pub language: Option<String>,
    /// Title tag.
    pub title: Option<String>,
    /// Handler name tag (MP4 containers use it as a track label).
    pub handler_name: Option<String>,
}

impl StreamDescriptor {
    /// Whether this is an audio stream encoded as AAC.
    pub fn is_aac(&self) -> bool {
        self.kind == StreamKind::Audio && self.codec.eq_ignore_ascii_case("aac")
    }

    /// Whether this is a 2-channel audio stream.
    pub fn is_stereo(&self) -> bool {
        self.kind == StreamKind::Audio && self.channels == Some(2)
    }

    /// Whether this is a video stream encoded as H.265/HEVC.
    pub fn is_hevc(&self) -> bool {
        self.kind == StreamKind::Video
            && (self.codec.eq_ignore_ascii_case("hevc") || self.codec.eq_ignore_ascii_case("h265"))
    }
}

/// Stream layout of a probed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbedFile {
    /// Path to the media file.
    pub path: PathBuf,
    /// Streams in container order.
    pub streams: Vec<StreamDescriptor>,
}

impl ProbedFile {
    /// Build a probed file from an already known stream list.
    pub fn new(path: impl Into<PathBuf>, streams: Vec<StreamDescriptor>) -> Self {
        Self {
            path: path.into(),
            streams,
        }
    }

    /// Lowercased container extension of the file.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    /// Streams of the given kind, in container order.
    pub fn streams_of(&self, kind: StreamKind) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }
}

pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}
