//! Shared helpers for integration tests.
//!
//! Provides a [`TestHarness`] holding a temporary staging/handoff layout and
//! a [`Config`] whose polling is fast enough for tests, plus helpers that
//! write stand-in executables for ffprobe and rclone.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use debridflow::config::{
    ArrConfig, ArrType, Config, PollSettings, ServiceConfig,
};
use debridflow::poll::PollPolicy;
use tempfile::TempDir;

/// Polling policy used against mock servers.
pub fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy::new(Duration::from_millis(10), max_attempts)
}

pub fn service(url: &str) -> ServiceConfig {
    ServiceConfig {
        url: url.to_string(),
        api_key: "test-key".to_string(),
        enabled: true,
    }
}

pub fn arr(arr_type: ArrType, url: &str) -> ArrConfig {
    ArrConfig {
        name: format!("{:?}", arr_type).to_lowercase(),
        arr_type,
        url: url.to_string(),
        api_key: "arr-key".to_string(),
        enabled: true,
        auto_rescan: true,
    }
}

/// Temporary directories plus a config pointing at them.
pub struct TestHarness {
    pub root: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");

        let mut config = Config::default();
        config.download.staging_dir = root.path().join("staging");
        config.handoff.dir = root.path().join("handoff");
        config.download.progress_interval_secs = 1;

        let fast = PollSettings {
            interval_secs: 0,
            max_attempts: 5,
            initial_delay_secs: 0,
        };
        config.polling.debrid = fast;
        config.polling.arr = fast;
        config.polling.emby = fast;
        config.polling.jellyseerr = fast;

        std::fs::create_dir_all(&config.download.staging_dir).unwrap();
        std::fs::create_dir_all(&config.handoff.dir).unwrap();

        Self { root, config }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Create `<staging>/<name>` and return it.
    pub fn release_dir(&self, name: &str) -> PathBuf {
        let dir = self.config.download.staging_dir.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

/// ffprobe output of an MP4 that already has a default AAC 2.0 track.
pub const COMPLIANT_MP4_PROBE: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "video", "codec_name": "h264", "disposition": {"default": 1}},
    {"index": 1, "codec_type": "audio", "codec_name": "aac", "channels": 2, "disposition": {"default": 1}, "tags": {"language": "eng"}}
  ]
}"#;
