//! Transcode decision engine.
//!
//! Given the streams of one file, decide the single cheapest operation that
//! leaves it with H.264 video, a default AAC 2.0 track and an MP4 container.
//! Rules are tried in a fixed order and the first match wins:
//!
//! 1. HEVC video is rejected outright.
//! 2. A default AAC 2.0 track inside an MP4 needs nothing.
//! 3. An AAC 2.0 track that is not the default gets the default flag.
//! 4. An AAC track with another channel count gets a stereo downmix added.
//! 5. Any other audio gets a new AAC 2.0 encode added.

mod subtitles;

pub use subtitles::{select_subtitles, SubtitleExtraction, FORCED_SUFFIX};

use crate::probe::{ProbedFile, StreamKind};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Corrective operation chosen for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// File already compliant.
    NoOp,
    /// Move the default disposition onto an existing AAC 2.0 track.
    ReflagDefault,
    /// Append a stereo downmix of an AAC surround track.
    AddStereoMix,
    /// Append an AAC 2.0 encode of a non-AAC track.
    TranscodeToAac,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::NoOp => write!(f, "no-op"),
            PlanAction::ReflagDefault => write!(f, "re-flag default"),
            PlanAction::AddStereoMix => write!(f, "add stereo mix"),
            PlanAction::TranscodeToAac => write!(f, "transcode to AAC"),
        }
    }
}

/// Audio plan for one file. Indices are audio-relative (`a:N`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodePlan {
    pub action: PlanAction,
    /// Audio stream the action works on.
    pub target_audio_index: Option<usize>,
    /// Audio stream flagged default before the action.
    pub current_default_audio_index: Option<usize>,
    /// Number of audio streams in the source.
    pub total_audio_streams: usize,
}

impl TranscodePlan {
    fn no_op(total_audio_streams: usize, current_default_audio_index: Option<usize>) -> Self {
        Self {
            action: PlanAction::NoOp,
            target_audio_index: None,
            current_default_audio_index,
            total_audio_streams,
        }
    }

    /// Whether executing this plan rewrites the file.
    pub fn rewrites_file(&self) -> bool {
        self.action != PlanAction::NoOp
    }

    /// Output audio index of the stream that ends up flagged default.
    pub fn new_default_audio_index(&self) -> Option<usize> {
        match self.action {
            PlanAction::NoOp => self.current_default_audio_index,
            PlanAction::ReflagDefault => self.target_audio_index,
            PlanAction::AddStereoMix | PlanAction::TranscodeToAac => {
                Some(self.total_audio_streams)
            }
        }
    }
}

/// Everything decided for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub plan: TranscodePlan,
    pub subtitles: Vec<SubtitleExtraction>,
}

/// Accumulated facts about the audio streams, in a single pass.
#[derive(Debug, Default)]
struct AudioScan {
    total: usize,
    default: Option<usize>,
    stereo_aac: Option<usize>,
    stereo_aac_default: Option<usize>,
    surround_aac: Option<usize>,
    other_codec: Option<usize>,
}

impl AudioScan {
    fn scan(file: &ProbedFile) -> Self {
        let mut acc = Self::default();

        for stream in file.streams_of(StreamKind::Audio) {
            let position = acc.total;
            acc.total += 1;

            if stream.default && acc.default.is_none() {
                acc.default = Some(position);
            }

            if stream.is_aac() && stream.is_stereo() {
                if stream.default {
                    acc.stereo_aac_default.get_or_insert(position);
                } else {
                    acc.stereo_aac.get_or_insert(position);
                }
            } else if stream.is_aac() {
                acc.surround_aac.get_or_insert(position);
            } else {
                acc.other_codec.get_or_insert(position);
            }
        }

        acc
    }
}

/// Decide the plan and subtitle extractions for a probed file.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCodec`] when any video stream is HEVC.
///
/// # Example
///
/// ```
/// use debridflow_av::{decide, PlanAction, ProbedFile, StreamDescriptor, StreamKind};
///
/// let ac3 = StreamDescriptor {
///     index: 1,
///     kind: StreamKind::Audio,
///     codec: "ac3".into(),
///     channels: Some(6),
///     default: true,
///     forced: false,
///     hearing_impaired: false,
///     language: Some("eng".into()),
///     title: None,
///     handler_name: None,
/// };
/// let decision = decide(&ProbedFile::new("movie.mkv", vec![ac3]))?;
/// assert_eq!(decision.plan.action, PlanAction::TranscodeToAac);
/// assert_eq!(decision.plan.target_audio_index, Some(0));
/// # Ok::<(), debridflow_av::Error>(())
/// ```
pub fn decide(file: &ProbedFile) -> Result<Decision> {
    if let Some(hevc) = file.streams.iter().find(|s| s.is_hevc()) {
        return Err(Error::unsupported_codec(hevc.codec.clone()));
    }

    let is_mp4 = file.extension().as_deref() == Some("mp4");
    let compliant = file
        .streams_of(StreamKind::Audio)
        .any(|s| s.is_aac() && s.is_stereo() && s.default);

    let audio = AudioScan::scan(file);

    if compliant && is_mp4 {
        #[cfg(feature = "tracing")]
        tracing::info!("{:?} meets requirements, remuxing not needed", file.path);

        return Ok(Decision {
            plan: TranscodePlan::no_op(audio.total, audio.default),
            subtitles: Vec::new(),
        });
    }

    let subtitles = select_subtitles(file);
    let plan = plan_audio(&audio);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Decision for {:?}: {} (target {:?}, default {:?}, {} audio), {} subtitle(s)",
        file.path,
        plan.action,
        plan.target_audio_index,
        plan.current_default_audio_index,
        plan.total_audio_streams,
        subtitles.len()
    );

    Ok(Decision { plan, subtitles })
}

fn plan_audio(audio: &AudioScan) -> TranscodePlan {
    let with = |action, target| TranscodePlan {
        action,
        target_audio_index: Some(target),
        current_default_audio_index: audio.default,
        total_audio_streams: audio.total,
    };

    if let Some(target) = audio.stereo_aac_default {
        // Already flagged; only the container is wrong, a stream-copy remux fixes it.
        with(PlanAction::ReflagDefault, target)
    } else if let Some(target) = audio.stereo_aac {
        with(PlanAction::ReflagDefault, target)
    } else if let Some(target) = audio.surround_aac {
        with(PlanAction::AddStereoMix, target)
    } else if let Some(target) = audio.other_codec {
        with(PlanAction::TranscodeToAac, target)
    } else {
        TranscodePlan::no_op(audio.total, audio.default)
    }
}
