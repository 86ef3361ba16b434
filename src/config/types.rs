use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub debrid: DebridConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub arrs: Vec<ArrConfig>,

    #[serde(default)]
    pub bazarr: Option<ServiceConfig>,

    #[serde(default)]
    pub emby: Option<ServiceConfig>,

    #[serde(default)]
    pub jellyseerr: Option<ServiceConfig>,

    #[serde(default)]
    pub handoff: HandoffConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// First enabled arr of the given type.
    pub fn arr(&self, arr_type: ArrType) -> Option<&ArrConfig> {
        self.arrs
            .iter()
            .find(|a| a.enabled && a.arr_type == arr_type)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DebridConfig {
    #[serde(default = "default_debrid_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Requests per second allowed against the debrid API
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Pause between consecutive unrestrict calls
    #[serde(default = "default_unrestrict_delay")]
    pub unrestrict_delay_ms: u64,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_debrid_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}
fn default_requests_per_second() -> u32 {
    4
}
fn default_unrestrict_delay() -> u64 {
    100
}
fn default_http_timeout() -> u64 {
    30
}

impl Default for DebridConfig {
    fn default() -> Self {
        Self {
            base_url: default_debrid_url(),
            api_key: String::new(),
            requests_per_second: default_requests_per_second(),
            unrestrict_delay_ms: default_unrestrict_delay(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Directory releases are downloaded into, one subdirectory per release
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,

    /// Edge host (e.g. `sao1`) that download links are rewritten to.
    /// Disabled when unset.
    #[serde(default)]
    pub edge_host: Option<String>,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("./downloads")
}
fn default_concurrency() -> usize {
    4
}
fn default_progress_interval() -> u64 {
    1
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            concurrency: default_concurrency(),
            progress_interval_secs: default_progress_interval(),
            edge_host: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// rclone remote name, without the trailing colon
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_movies_dir")]
    pub movies_dir: String,

    #[serde(default = "default_series_dir")]
    pub series_dir: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_remote() -> String {
    "remote".to_string()
}
fn default_movies_dir() -> String {
    "Movies".to_string()
}
fn default_series_dir() -> String {
    "Series".to_string()
}
fn default_batch_size() -> usize {
    3
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            movies_dir: default_movies_dir(),
            series_dir: default_series_dir(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArrConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub arr_type: ArrType,

    pub url: String,

    pub api_key: String,

    #[serde(default)]
    pub enabled: bool,

    /// Trigger a rescan in the Arr after upload (default: true)
    #[serde(default = "default_true")]
    pub auto_rescan: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArrType {
    Radarr,
    Sonarr,
}

/// Bazarr, Emby and Jellyseerr all take a base URL and an API key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub url: String,

    pub api_key: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HandoffConfig {
    /// Directory holding `<download id>.json` handoff files
    #[serde(default = "default_handoff_dir")]
    pub dir: PathBuf,
}

fn default_handoff_dir() -> PathBuf {
    PathBuf::from("./handoff")
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            dir: default_handoff_dir(),
        }
    }
}

/// Interval, attempt budget and initial delay of one kind of remote job.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct PollSettings {
    pub interval_secs: u64,

    pub max_attempts: u32,

    #[serde(default)]
    pub initial_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_debrid_poll")]
    pub debrid: PollSettings,

    #[serde(default = "default_arr_poll")]
    pub arr: PollSettings,

    #[serde(default = "default_emby_poll")]
    pub emby: PollSettings,

    #[serde(default = "default_jellyseerr_poll")]
    pub jellyseerr: PollSettings,
}

fn default_debrid_poll() -> PollSettings {
    PollSettings {
        interval_secs: 1,
        max_attempts: 7200,
        initial_delay_secs: 0,
    }
}
fn default_arr_poll() -> PollSettings {
    PollSettings {
        interval_secs: 5,
        max_attempts: 720,
        initial_delay_secs: 5,
    }
}
fn default_emby_poll() -> PollSettings {
    PollSettings {
        interval_secs: 10,
        max_attempts: 360,
        initial_delay_secs: 60,
    }
}
fn default_jellyseerr_poll() -> PollSettings {
    PollSettings {
        interval_secs: 10,
        max_attempts: 360,
        initial_delay_secs: 0,
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            debrid: default_debrid_poll(),
            arr: default_arr_poll(),
            emby: default_emby_poll(),
            jellyseerr: default_jellyseerr_poll(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default)]
    pub rclone_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Append log output to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Default filter when `RUST_LOG` is unset, e.g. `info`
    #[serde(default)]
    pub level: Option<String>,
}
