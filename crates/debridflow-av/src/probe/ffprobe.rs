//! FFprobe-based stream probing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    forced: u8,
    #[serde(default)]
    hearing_impaired: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    #[serde(alias = "LANGUAGE")]
    language: Option<String>,
    #[serde(alias = "TITLE")]
    title: Option<String>,
    #[serde(alias = "HANDLER_NAME")]
    handler_name: Option<String>,
}

/// Probe a media file using ffprobe.
pub fn probe_with_ffprobe(ffprobe: &Path, path: &Path) -> Result<ProbedFile> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Probing streams of {:?}", path);

    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffprobe")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("ffprobe", stderr.to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    parse_ffprobe_json(path, &json_str)
}

/// Turn ffprobe's `-show_streams` JSON into a [`ProbedFile`].
///
/// Streams that are neither video, audio nor subtitle (data tracks, fonts
/// attached to MKV files) are dropped.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<ProbedFile> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let streams = output
        .streams
        .into_iter()
        .filter_map(|stream| {
            let kind = match stream.codec_type.as_deref() {
                Some("video") => StreamKind::Video,
                Some("audio") => StreamKind::Audio,
                Some("subtitle") => StreamKind::Subtitle,
                _ => return None,
            };

            Some(StreamDescriptor {
                index: stream.index,
                kind,
                codec: stream.codec_name.unwrap_or_default(),
                channels: match kind {
                    StreamKind::Audio => stream.channels,
                    _ => None,
                },
                default: stream.disposition.default == 1,
                forced: stream.disposition.forced == 1,
                hearing_impaired: stream.disposition.hearing_impaired == 1,
                language: stream.tags.language,
                title: stream.tags.title,
                handler_name: stream.tags.handler_name,
            })
        })
        .collect();

    Ok(ProbedFile::new(path, streams))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "disposition": { "default": 1, "forced": 0 },
                "tags": { "language": "und" }
            },
            {
                "index": 1,
                "codec_name": "eac3",
                "codec_type": "audio",
                "channels": 6,
                "disposition": { "default": 1 },
                "tags": { "language": "eng", "title": "DDP 5.1" }
            },
            {
                "index": 2,
                "codec_name": "subrip",
                "codec_type": "subtitle",
                "disposition": { "default": 0, "forced": 1 },
                "tags": { "language": "spa", "title": "Latinoamérica", "HANDLER_NAME": "Hearing Impaired" }
            },
            {
                "index": 3,
                "codec_name": "ttf",
                "codec_type": "attachment"
            }
        ]
    }"#;

    #[test]
    fn test_parse_ffprobe_json() {
        let file = parse_ffprobe_json(Path::new("/tmp/movie.mkv"), SAMPLE).unwrap();

        assert_eq!(file.streams.len(), 3);
        assert_eq!(file.extension().as_deref(), Some("mkv"));

        let video = &file.streams[0];
        assert_eq!(video.kind, StreamKind::Video);
        assert_eq!(video.codec, "h264");
        assert_eq!(video.channels, None);

        let audio = &file.streams[1];
        assert_eq!(audio.kind, StreamKind::Audio);
        assert_eq!(audio.channels, Some(6));
        assert!(audio.default);
        assert_eq!(audio.language.as_deref(), Some("eng"));

        let sub = &file.streams[2];
        assert_eq!(sub.kind, StreamKind::Subtitle);
        assert!(sub.forced);
        assert!(!sub.default);
        assert_eq!(sub.title.as_deref(), Some("Latinoamérica"));
        assert_eq!(sub.handler_name.as_deref(), Some("Hearing Impaired"));
    }

    #[test]
    fn test_parse_empty_stream_list() {
        let file = parse_ffprobe_json(Path::new("a.mp4"), "{}").unwrap();
        assert!(file.streams.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_ffprobe_json(Path::new("a.mp4"), "not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_probe_missing_file() {
        let err = probe_with_ffprobe(Path::new("ffprobe"), Path::new("/no/such/file.mkv"))
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
