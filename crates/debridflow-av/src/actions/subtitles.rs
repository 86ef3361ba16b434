//! WebVTT sidecar extraction.

use super::run_ffmpeg;
use crate::plan::SubtitleExtraction;
use crate::{Error, Result, Tools};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Arguments that extract one subtitle stream to WebVTT.
pub fn subtitle_args(task: &SubtitleExtraction) -> Vec<String> {
    vec![
        "-map".to_string(),
        format!("0:s:{}", task.subtitle_ordinal),
        "-c:s".to_string(),
        "webvtt".to_string(),
    ]
}

/// Sidecar path for `task` next to `source`.
pub fn sidecar_for(source: &Path, task: &SubtitleExtraction) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid input file path: {:?}", source)))?;
    Ok(source.with_file_name(task.output_name(stem)))
}

/// Extract one subtitle stream from `source` into a `.vtt` file beside it.
pub fn extract_subtitle(tools: &Tools, source: &Path, task: &SubtitleExtraction) -> Result<PathBuf> {
    let output = sidecar_for(source, task)?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Extracting subtitle s:{} ({}) to {:?}",
        task.subtitle_ordinal,
        task.language,
        output
    );

    let mut cmd = Command::new(&tools.ffmpeg);
    cmd.args(["-hide_banner", "-nostdin", "-y", "-sub_charenc", "UTF-8", "-i"])
        .arg(source)
        .args(subtitle_args(task))
        .arg(&output);

    run_ffmpeg(&mut cmd, "Failed to extract subtitle")?;
    Ok(output)
}
