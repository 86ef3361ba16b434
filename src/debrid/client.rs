use super::types::{AddedTorrent, TorrentInfo, UnrestrictedLink};
use crate::config::DebridConfig;
use crate::poll::{await_terminal, JobKind, JobState, PollError, PollPolicy, RemoteJob};
use anyhow::{Context, Result};
use debridflow_common::paths::is_video_file;
use governor::{Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response};
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Client for the debrid REST API.
///
/// Every request carries the bearer token and waits on a token-bucket
/// limiter first.
pub struct DebridClient {
    client: Client,
    base_url: String,
    api_key: String,
    unrestrict_delay: Duration,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl DebridClient {
    pub fn new(config: &DebridConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            anyhow::bail!("Debrid API key is not configured");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            unrestrict_delay: Duration::from_millis(config.unrestrict_delay_ms),
            rate_limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, context_msg: &str) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| context_msg.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            anyhow::bail!("{}: {} {}", context_msg, status, error);
        }

        Ok(response)
    }

    /// Submit a magnet link.
    pub async fn add_magnet(&self, magnet: &str) -> Result<AddedTorrent> {
        let request = self
            .client
            .post(self.url("/torrents/addMagnet"))
            .form(&[("magnet", magnet)]);

        let added: AddedTorrent = self
            .send(request, "Failed to add magnet")
            .await?
            .json()
            .await
            .context("Invalid addMagnet response")?;

        info!("Added magnet as torrent {}", added.id);
        Ok(added)
    }

    /// Upload the contents of a `.torrent` file.
    pub async fn add_torrent(&self, torrent: Vec<u8>) -> Result<AddedTorrent> {
        let request = self
            .client
            .put(self.url("/torrents/addTorrent"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-bittorrent")
            .body(torrent);

        let added: AddedTorrent = self
            .send(request, "Failed to add torrent")
            .await?
            .json()
            .await
            .context("Invalid addTorrent response")?;

        info!("Uploaded torrent file as {}", added.id);
        Ok(added)
    }

    /// Submit a `.torrent` file from disk.
    pub async fn add_torrent_file(&self, path: &Path) -> Result<AddedTorrent> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read torrent file: {:?}", path))?;
        self.add_torrent(bytes).await
    }

    pub async fn torrent_info(&self, id: &str) -> Result<TorrentInfo> {
        let request = self.client.get(self.url(&format!("/torrents/info/{}", id)));

        self.send(request, "Failed to get torrent info")
            .await?
            .json()
            .await
            .context("Invalid torrent info response")
    }

    /// Select which files of the torrent the service should fetch.
    pub async fn select_files(&self, id: &str, file_ids: &[u64]) -> Result<()> {
        if file_ids.is_empty() {
            anyhow::bail!("Torrent {} contains no video files", id);
        }

        let files = file_ids
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",");

        debug!("Selecting files {} of torrent {}", files, id);

        let request = self
            .client
            .post(self.url(&format!("/torrents/selectFiles/{}", id)))
            .form(&[("files", files.as_str())]);

        self.send(request, "Failed to select torrent files").await?;
        Ok(())
    }

    /// Turn a hoster link into a direct download URL.
    pub async fn unrestrict_link(&self, link: &str) -> Result<UnrestrictedLink> {
        let request = self
            .client
            .post(self.url("/unrestrict/link"))
            .form(&[("link", link)]);

        self.send(request, "Failed to unrestrict link")
            .await?
            .json()
            .await
            .context("Invalid unrestrict response")
    }

    /// Unrestrict every link in order, pausing between calls.
    pub async fn unrestrict_all(&self, links: &[String]) -> Result<Vec<UnrestrictedLink>> {
        let mut resolved = Vec::with_capacity(links.len());

        for (i, link) in links.iter().enumerate() {
            if i > 0 && !self.unrestrict_delay.is_zero() {
                tokio::time::sleep(self.unrestrict_delay).await;
            }
            resolved.push(self.unrestrict_link(link).await?);
        }

        info!("Unrestricted {} links", resolved.len());
        Ok(resolved)
    }

    /// Poll a freshly added torrent until its file list is known.
    pub async fn wait_for_file_selection(
        &self,
        id: &str,
        policy: &PollPolicy,
    ) -> std::result::Result<TorrentInfo, PollError> {
        let job = RemoteJob::new(id, JobKind::TorrentAdd);
        await_terminal(
            &job,
            policy,
            || self.torrent_info(id),
            |info: &TorrentInfo| classify_file_listing(&info.status),
        )
        .await
    }

    /// Poll the torrent until its files are available for download.
    pub async fn wait_until_ready(
        &self,
        id: &str,
        policy: &PollPolicy,
    ) -> std::result::Result<TorrentInfo, PollError> {
        let job = RemoteJob::new(id, JobKind::TorrentAdd);
        await_terminal(
            &job,
            policy,
            || self.torrent_info(id),
            |info: &TorrentInfo| classify_torrent_status(&info.status),
        )
        .await
    }
}

/// Map a debrid torrent status onto the poller's states.
pub fn classify_torrent_status(status: &str) -> JobState {
    match status {
        "magnet_error" | "error" | "virus" | "dead" => JobState::Fatal,
        "magnet_conversion" | "waiting_files_selection" | "queued" | "downloading"
        | "uploading" => JobState::Pending,
        _ => JobState::Success,
    }
}

/// A torrent lists its files once magnet conversion is over.
pub fn classify_file_listing(status: &str) -> JobState {
    match classify_torrent_status(status) {
        JobState::Fatal => JobState::Fatal,
        _ if status == "magnet_conversion" => JobState::Pending,
        _ => JobState::Success,
    }
}

/// Ids of the torrent's files that look like videos.
pub fn video_file_ids(info: &TorrentInfo) -> Vec<u64> {
    info.files
        .iter()
        .filter(|f| is_video_file(Path::new(&f.path)))
        .map(|f| f.id)
        .collect()
}
