//! # debridflow-av
//!
//! Stream probing and compliance transcoding for downloaded releases.
//!
//! This crate provides functionality for:
//! - Probing media files into a flat list of [`StreamDescriptor`]s
//! - Deciding the minimal corrective operation that makes a file play
//!   everywhere: H.264 video, a default AAC 2.0 track, MP4 container,
//!   WebVTT sidecar subtitles
//! - Executing that decision with ffmpeg, replacing the original file only
//!   once the new one has been written
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use debridflow_av::{decide, probe, Tools};
//!
//! let tools = Tools::discover(None, None)?;
//! let probed = probe(&tools, "/downloads/Movie.2023.mkv")?;
//! let decision = decide(&probed)?;
//! println!("Action: {}", decision.plan.action);
//! # Ok::<(), debridflow_av::Error>(())
//! ```

mod error;
pub mod actions;
pub mod plan;
pub mod probe;
pub mod tools;
pub mod workspace;

// Re-exports
pub use actions::{apply, Outcome};
pub use error::{Error, Result};
pub use plan::{decide, Decision, PlanAction, SubtitleExtraction, TranscodePlan};
pub use probe::{ProbedFile, StreamDescriptor, StreamKind};
pub use tools::{check_tools, require_tool, ToolInfo, Tools};
pub use workspace::SidecarWorkspace;

/// Probe a media file and return its stream layout.
///
/// # Example
///
/// ```no_run
/// use debridflow_av::{probe, Tools};
///
/// let tools = Tools::discover(None, None)?;
/// let probed = probe(&tools, "/downloads/Movie.2023.mkv")?;
/// println!("{} streams", probed.streams.len());
/// # Ok::<(), debridflow_av::Error>(())
/// ```
pub fn probe<P: AsRef<std::path::Path>>(tools: &Tools, path: P) -> Result<ProbedFile> {
    probe::probe_with_ffprobe(&tools.ffprobe, path.as_ref())
}
