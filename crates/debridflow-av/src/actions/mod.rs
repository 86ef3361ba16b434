//! Execution of transcode decisions.
//!
//! Subtitles are extracted first, from the untouched source. The audio
//! rewrite then runs through a [`SidecarWorkspace`] so the source file is
//! only replaced once ffmpeg has produced the new one.

mod audio;
mod subtitles;

pub use audio::{audio_args, rewrite_audio, AAC_STEREO_BITRATE};
pub use subtitles::{extract_subtitle, sidecar_for, subtitle_args};

use crate::plan::Decision;
use crate::workspace::SidecarWorkspace;
use crate::{Error, Result, Tools};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Result of applying a [`Decision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Final path of the video file.
    pub output: PathBuf,
    /// Whether the video file was rewritten.
    pub rewritten: bool,
    /// Extracted WebVTT sidecars.
    pub subtitles: Vec<PathBuf>,
}

/// Apply a decision to `source`.
///
/// Subtitle extraction failures are logged and skipped. A failed audio
/// rewrite restores the source and returns the error.
pub fn apply(tools: &Tools, decision: &Decision, source: &Path) -> Result<Outcome> {
    if !source.exists() {
        return Err(Error::file_not_found(source));
    }

    let mut extracted = Vec::new();
    for task in &decision.subtitles {
        match extract_subtitle(tools, source, task) {
            Ok(path) => extracted.push(path),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Skipping subtitle s:{} of {:?}: {}",
                    task.subtitle_ordinal,
                    source,
                    _e
                );
            }
        }
    }

    if !decision.plan.rewrites_file() {
        #[cfg(feature = "tracing")]
        tracing::info!("{:?} already compliant", source);

        return Ok(Outcome {
            output: source.to_path_buf(),
            rewritten: false,
            subtitles: extracted,
        });
    }

    let workspace = SidecarWorkspace::begin(source)?;
    match rewrite_audio(tools, &decision.plan, workspace.original(), workspace.output()) {
        Ok(()) => {
            let output = workspace.commit()?;
            Ok(Outcome {
                output,
                rewritten: true,
                subtitles: extracted,
            })
        }
        Err(e) => {
            if let Err(_restore) = workspace.rollback() {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to restore {:?}: {}", source, _restore);
            }
            Err(e)
        }
    }
}

/// Run an ffmpeg command, mapping a non-zero exit to [`Error::ToolFailed`].
pub(crate) fn run_ffmpeg(cmd: &mut Command, context: &str) -> Result<()> {
    #[cfg(feature = "tracing")]
    tracing::debug!("Running {:?}", cmd);

    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found("ffmpeg")
        } else {
            Error::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        return Err(Error::tool_failed(
            "ffmpeg",
            format!("{}: {}", context, tail.join("\n")),
        ));
    }

    Ok(())
}
