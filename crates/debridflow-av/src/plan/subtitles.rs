//! Subtitle selection for WebVTT sidecar extraction.

use crate::probe::{ProbedFile, StreamDescriptor, StreamKind};
use serde::Serialize;

/// Output suffix for hearing-impaired / forced tracks.
pub const FORCED_SUFFIX: &str = ".forced";

/// Title fragments marking Latin-American Spanish.
const LATIN_AMERICA_MARKERS: &[&str] = &["latin america", "latinoamérica", "latinoamerica"];

/// One subtitle stream to extract as a sidecar file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleExtraction {
    /// Absolute stream index inside the container.
    pub stream_index: u32,
    /// Position among subtitle streams (the `N` in ffmpeg's `s:N`).
    pub subtitle_ordinal: usize,
    /// Language code used in the output file name.
    pub language: String,
    /// Extra tag appended after the language, e.g. `.forced`.
    pub suffix: Option<&'static str>,
}

impl SubtitleExtraction {
    /// File name of the extracted sidecar for a video with the given stem.
    ///
    /// ```
    /// use debridflow_av::SubtitleExtraction;
    ///
    /// let task = SubtitleExtraction {
    ///     stream_index: 3,
    ///     subtitle_ordinal: 0,
    ///     language: "es".into(),
    ///     suffix: Some(".forced"),
    /// };
    /// assert_eq!(task.output_name("Movie (2023)"), "Movie (2023).es.forced.vtt");
    /// ```
    pub fn output_name(&self, stem: &str) -> String {
        format!("{}.{}{}.vtt", stem, self.language, self.suffix.unwrap_or(""))
    }
}

/// Pick the subtitle streams worth extracting, in stream order.
///
/// English is always kept. Spanish is kept only when the title marks it as
/// Latin-American. Everything else is ignored.
pub fn select_subtitles(file: &ProbedFile) -> Vec<SubtitleExtraction> {
    file.streams_of(StreamKind::Subtitle)
        .enumerate()
        .filter_map(|(ordinal, stream)| {
            let language = output_language(stream)?;
            Some(SubtitleExtraction {
                stream_index: stream.index,
                subtitle_ordinal: ordinal,
                language,
                suffix: is_hearing_impaired(stream).then_some(FORCED_SUFFIX),
            })
        })
        .collect()
}

fn output_language(stream: &StreamDescriptor) -> Option<String> {
    let language = stream.language.as_deref()?.to_lowercase();
    match language.as_str() {
        "eng" | "en" => Some(language),
        "spa" | "es" if is_latin_american(stream) => Some("es".to_string()),
        _ => None,
    }
}

fn is_latin_american(stream: &StreamDescriptor) -> bool {
    stream
        .title
        .as_deref()
        .map(|title| {
            let title = title.to_lowercase();
            LATIN_AMERICA_MARKERS.iter().any(|m| title.contains(m))
        })
        .unwrap_or(false)
}

fn is_hearing_impaired(stream: &StreamDescriptor) -> bool {
    let labelled = |tag: &Option<String>| {
        tag.as_deref()
            .map(|t| t.to_lowercase().contains("hearing impaired"))
            .unwrap_or(false)
    };

    stream.forced
        || stream.hearing_impaired
        || labelled(&stream.handler_name)
        || labelled(&stream.title)
}
