//! End-to-end import of a staged release with stand-in media tools and
//! mocked downstream services.

#![cfg(unix)]

mod common;

use std::path::{Path, PathBuf};

use common::{arr, service, write_script, TestHarness, COMPLIANT_MP4_PROBE};
use debridflow::config::ArrType;
use debridflow::handoff::Handoff;
use debridflow::pipeline::{ImportSummary, Orchestrator};
use debridflow_common::Category;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HEVC_MKV_PROBE: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "video", "codec_name": "hevc", "disposition": {"default": 1}},
    {"index": 1, "codec_type": "audio", "codec_name": "eac3", "channels": 6, "disposition": {"default": 1}}
  ]
}"#;

const SURROUND_MKV_PROBE: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "video", "codec_name": "h264", "disposition": {"default": 1}},
    {"index": 1, "codec_type": "audio", "codec_name": "ac3", "channels": 6, "disposition": {"default": 1}, "tags": {"language": "eng"}},
    {"index": 2, "codec_type": "subtitle", "codec_name": "subrip", "disposition": {"default": 0}, "tags": {"language": "eng"}},
    {"index": 3, "codec_type": "subtitle", "codec_name": "subrip", "disposition": {"default": 0}, "tags": {"language": "fre"}}
  ]
}"#;

struct FakeTools {
    rclone_log: PathBuf,
    ffmpeg_log: PathBuf,
}

/// Install ffprobe/ffmpeg/rclone stand-ins and point the config at them.
///
/// ffprobe answers with the JSON of the first pattern found in the file
/// name, or a compliant MP4 otherwise. ffmpeg creates its last argument.
fn install_tools(
    harness: &mut TestHarness,
    probes: &[(&str, &str)],
    rclone_exit: i32,
) -> FakeTools {
    let bin = harness.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();

    let mut cases = String::new();
    for (pattern, json) in probes {
        cases.push_str(&format!("*{}*)\ncat <<'JSON'\n{}\nJSON\n;;\n", pattern, json));
    }
    cases.push_str(&format!("*)\ncat <<'JSON'\n{}\nJSON\n;;\n", COMPLIANT_MP4_PROBE));

    let ffprobe = bin.join("ffprobe");
    write_script(
        &ffprobe,
        &format!("for last in \"$@\"; do :; done\ncase \"$last\" in\n{}esac", cases),
    );

    let ffmpeg_log = harness.path().join("ffmpeg.log");
    let ffmpeg = bin.join("ffmpeg");
    write_script(
        &ffmpeg,
        &format!(
            "for last in \"$@\"; do :; done\necho \"$@\" >> '{}'\n: > \"$last\"",
            ffmpeg_log.display()
        ),
    );

    let rclone_log = harness.path().join("rclone.log");
    let rclone = bin.join("rclone");
    write_script(
        &rclone,
        &format!("echo \"$@\" >> '{}'\nexit {}", rclone_log.display(), rclone_exit),
    );

    harness.config.tools.ffprobe_path = Some(ffprobe);
    harness.config.tools.ffmpeg_path = Some(ffmpeg);
    harness.config.tools.rclone_path = Some(rclone);

    FakeTools {
        rclone_log,
        ffmpeg_log,
    }
}

fn uploaded_names(log: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| {
            let file = line.strip_prefix("copy ")?.split(' ').next()?;
            Path::new(file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .collect();
    names.sort();
    names
}

fn write_handoff(harness: &TestHarness, download_id: &str, destination: &str) {
    Handoff {
        download_id: download_id.to_string(),
        id: 42,
        category: Category::Movie,
        destination: destination.to_string(),
    }
    .write(&harness.config.handoff.dir)
    .unwrap();
}

async fn mount_services(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v3/command"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 11, "name": "RescanMovie", "status": "queued"})),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/command/11"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 11, "name": "RescanMovie", "status": "completed"})),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/bazarr/radarr"))
        .and(body_string("radarr_moviefile_id=42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/emby/ScheduledTasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"Name": "Scan media library", "Key": "RefreshLibrary", "State": "Idle"}
        ])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/emby/Library/Refresh"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(
            "/seerr/api/v1/settings/jobs/jellyfin-recently-added-sync/run",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"running": false})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn import_uploads_and_cleans_up() {
    let server = MockServer::start().await;
    mount_services(&server).await;

    let mut harness = TestHarness::new();
    let tools = install_tools(&mut harness, &[], 0);
    harness.config.arrs = vec![arr(ArrType::Radarr, &server.uri())];
    harness.config.bazarr = Some(service(&format!("{}/bazarr", server.uri())));
    harness.config.emby = Some(service(&format!("{}/emby", server.uri())));
    harness.config.jellyseerr = Some(service(&format!("{}/seerr", server.uri())));

    let release = harness.release_dir("Movie.2023.1080p");
    std::fs::write(release.join("Movie.2023.1080p.mp4"), b"video").unwrap();
    std::fs::write(release.join("Movie.2023.1080p.nfo"), b"info").unwrap();
    std::fs::create_dir_all(release.join("Sample")).unwrap();
    std::fs::write(release.join("Sample").join("sample.mkv"), b"s").unwrap();

    write_handoff(&harness, "ABCDEF0123", "remote:Movies/Movie (2023)/");

    let config = Arc::new(harness.config.clone());
    let summary = Orchestrator::new(Arc::clone(&config))
        .import(&release, "ABCDEF0123")
        .await
        .unwrap();

    assert_eq!(
        summary,
        ImportSummary {
            transcoded: 0,
            unchanged: 1,
            skipped: 0,
            uploaded: 1,
            retained: Vec::new(),
        }
    );

    let uploads = std::fs::read_to_string(&tools.rclone_log).unwrap();
    let lines: Vec<_> = uploads.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("copy "));
    assert!(lines[0].contains("Movie.2023.1080p.mp4 remote:Movies/Movie (2023)/ -P"));

    assert!(!release.exists());
    assert!(!Handoff::path_for(&config.handoff.dir, "ABCDEF0123").exists());
}

#[tokio::test]
async fn failed_upload_keeps_staged_files() {
    let mut harness = TestHarness::new();
    install_tools(&mut harness, &[], 1);

    let release = harness.release_dir("Show.S01E01");
    std::fs::write(release.join("Show.S01E01.mp4"), b"video").unwrap();
    Handoff {
        download_id: "feed".to_string(),
        id: 7,
        category: Category::Series,
        destination: "remote:Series/Show/Season 1/".to_string(),
    }
    .write(&harness.config.handoff.dir)
    .unwrap();

    let config = Arc::new(harness.config.clone());
    let err = Orchestrator::new(Arc::clone(&config))
        .import(&release, "FEED")
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("rclone failed"));
    assert!(release.join("Show.S01E01.mp4").exists());
    assert!(Handoff::path_for(&config.handoff.dir, "feed").exists());
}

#[tokio::test]
async fn import_without_handoff_fails() {
    let mut harness = TestHarness::new();
    install_tools(&mut harness, &[], 0);
    let release = harness.release_dir("Unknown");

    let err = Orchestrator::new(Arc::new(harness.config.clone()))
        .import(&release, "nothing")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Failed to read handoff file"));
    assert!(release.exists());
}

#[tokio::test]
async fn rewritten_release_uploads_mp4_and_sidecars() {
    let mut harness = TestHarness::new();
    let tools = install_tools(&mut harness, &[("Surround", SURROUND_MKV_PROBE)], 0);

    let release = harness.release_dir("Surround.2022");
    let source = release.join("Surround.2022.mkv");
    std::fs::write(&source, b"matroska").unwrap();
    write_handoff(&harness, "c0ffee", "remote:Movies/Surround (2022)/");

    let config = Arc::new(harness.config.clone());
    let summary = Orchestrator::new(Arc::clone(&config))
        .import(&release, "c0ffee")
        .await
        .unwrap();

    assert_eq!(summary.transcoded, 1);
    assert_eq!(summary.uploaded, 2);
    assert!(summary.retained.is_empty());

    assert_eq!(
        uploaded_names(&tools.rclone_log),
        vec!["Surround.2022.eng.vtt", "Surround.2022.mp4"]
    );

    let ffmpeg_calls = std::fs::read_to_string(&tools.ffmpeg_log).unwrap();
    assert!(ffmpeg_calls.contains("-map 0:s:0 -c:s webvtt"));
    assert!(!ffmpeg_calls.contains("0:s:1"));
    assert!(ffmpeg_calls.contains("Surround.2022.mkv.original"));
    assert!(ffmpeg_calls.contains("-c:a:1 aac"));

    assert!(!release.exists());
}

#[tokio::test]
async fn unsupported_video_is_left_in_staging() {
    let mut harness = TestHarness::new();
    let tools = install_tools(&mut harness, &[("HEVC", HEVC_MKV_PROBE)], 0);

    let release = harness.release_dir("Pack");
    let hevc = release.join("Movie.HEVC.mkv");
    std::fs::write(&hevc, b"hevc").unwrap();
    std::fs::write(release.join("Movie.mp4"), b"ok").unwrap();
    std::fs::write(release.join("Movie.nfo"), b"nfo").unwrap();
    write_handoff(&harness, "beef", "remote:Movies/Movie/");

    let config = Arc::new(harness.config.clone());
    let summary = Orchestrator::new(Arc::clone(&config))
        .import(&release, "beef")
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.retained, vec![hevc.clone()]);
    assert_eq!(uploaded_names(&tools.rclone_log), vec!["Movie.mp4"]);

    assert_eq!(std::fs::read(&hevc).unwrap(), b"hevc");
    assert!(!release.join("Movie.nfo").exists());
    assert!(Handoff::path_for(&config.handoff.dir, "beef").exists());
}

#[tokio::test]
async fn mkv_without_audio_is_not_dropped() {
    let mut harness = TestHarness::new();
    let silent = r#"{"streams": [{"index": 0, "codec_type": "video", "codec_name": "h264"}]}"#;
    let tools = install_tools(&mut harness, &[("Silent", silent)], 0);

    let release = harness.release_dir("Silent");
    let video = release.join("Silent.mkv");
    std::fs::write(&video, b"mkv").unwrap();
    write_handoff(&harness, "ab12", "remote:Movies/Silent/");

    let summary = Orchestrator::new(Arc::new(harness.config.clone()))
        .import(&release, "ab12")
        .await
        .unwrap();

    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.retained, vec![video.clone()]);
    assert!(video.exists());
    assert!(uploaded_names(&tools.rclone_log).is_empty());
}
