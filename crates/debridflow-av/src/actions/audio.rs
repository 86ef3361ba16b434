//! Audio layout rewrite.

use super::run_ffmpeg;
use crate::plan::{PlanAction, TranscodePlan};
use crate::{Error, Result, Tools};
use std::path::Path;
use std::process::Command;

/// Bitrate of the added AAC stereo track.
pub const AAC_STEREO_BITRATE: &str = "256k";

/// Title given to the added AAC stereo track.
const STEREO_TRACK_TITLE: &str = "AAC 2.0";

/// Render the stream-mapping, codec and disposition options for a plan.
///
/// Input and output paths are not included; see [`rewrite_audio`].
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a NoOp plan or a plan without target.
pub fn audio_args(plan: &TranscodePlan) -> Result<Vec<String>> {
    let target = plan
        .target_audio_index
        .ok_or_else(|| Error::InvalidInput(format!("{} plan has no target stream", plan.action)))?;

    let mut args: Vec<String> = vec!["-map".into(), "0:v".into(), "-map".into(), "0:a".into()];

    match plan.action {
        PlanAction::NoOp => {
            return Err(Error::InvalidInput("no-op plan has nothing to render".into()));
        }
        PlanAction::ReflagDefault => {
            args.extend([
                "-c".into(),
                "copy".into(),
                "-disposition:a".into(),
                "0".into(),
                format!("-disposition:a:{}", target),
                "default".into(),
            ]);
        }
        PlanAction::AddStereoMix | PlanAction::TranscodeToAac => {
            let added = plan.total_audio_streams;
            args.extend([
                "-map".into(),
                format!("0:a:{}", target),
                "-c:v".into(),
                "copy".into(),
                "-c:a".into(),
                "copy".into(),
                format!("-c:a:{}", added),
                "aac".into(),
                format!("-ac:a:{}", added),
                "2".into(),
                format!("-b:a:{}", added),
                AAC_STEREO_BITRATE.into(),
                format!("-metadata:s:a:{}", added),
                format!("title={}", STEREO_TRACK_TITLE),
                "-disposition:a".into(),
                "0".into(),
                format!("-disposition:a:{}", added),
                "default".into(),
            ]);
        }
    }

    args.extend([
        "-movflags".into(),
        "+faststart".into(),
        "-f".into(),
        "mp4".into(),
    ]);

    Ok(args)
}

/// Run ffmpeg to write `output` from `input` according to the plan.
pub fn rewrite_audio(tools: &Tools, plan: &TranscodePlan, input: &Path, output: &Path) -> Result<()> {
    let args = audio_args(plan)?;

    #[cfg(feature = "tracing")]
    match plan.action {
        PlanAction::ReflagDefault => tracing::info!(
            "Changing a:{} to default",
            plan.target_audio_index.unwrap_or_default()
        ),
        PlanAction::AddStereoMix => tracing::info!("Creating AAC 2.0 audio stream"),
        _ => tracing::info!("Converting and creating new AAC 2.0 audio stream"),
    }

    let mut cmd = Command::new(&tools.ffmpeg);
    cmd.args(["-hide_banner", "-nostdin", "-y", "-i"])
        .arg(input)
        .args(&args)
        .arg(output);

    run_ffmpeg(&mut cmd, "Failed to rewrite audio layout")
}
