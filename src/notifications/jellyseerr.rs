use crate::config::ServiceConfig;
use crate::poll::{await_terminal, JobKind, JobState, PollPolicy, RemoteJob};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Job that picks up recently added media server items.
pub const RECENTLY_ADDED_SYNC_JOB: &str = "jellyfin-recently-added-sync";

#[derive(Debug, Clone, Deserialize)]
pub struct JobInfo {
    pub id: String,
    #[serde(default)]
    pub running: bool,
}

/// Observed state of the sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub running: bool,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.running { "running" } else { "finished" })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RunResponse {
    #[serde(default)]
    running: bool,
}

/// Jellyseerr request manager.
pub struct JellyseerrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl JellyseerrClient {
    pub fn new(config: &ServiceConfig) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Start the recently-added sync. Returns whether it reports running.
    pub async fn run_recently_added_sync(&self) -> Result<bool> {
        let response = self
            .client
            .post(self.url(&format!("/settings/jobs/{}/run", RECENTLY_ADDED_SYNC_JOB)))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Jellyseerr sync failed to start ({}): {}", status, body);
        }

        let run: RunResponse = response.json().await.context("Invalid job run response")?;
        Ok(run.running)
    }

    pub async fn jobs(&self) -> Result<Vec<JobInfo>> {
        let response = self
            .client
            .get(self.url("/settings/jobs"))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Jellyseerr jobs request failed ({})", response.status());
        }

        response.json().await.context("Invalid jobs response")
    }

    /// State of the sync job. A missing job is not running.
    pub async fn sync_status(&self) -> Result<SyncStatus> {
        let running = self
            .jobs()
            .await?
            .iter()
            .any(|j| j.id == RECENTLY_ADDED_SYNC_JOB && j.running);
        Ok(SyncStatus { running })
    }

    /// Start the sync and wait for it to finish.
    pub async fn sync_and_wait(&self, policy: &PollPolicy) -> Result<()> {
        if !self.run_recently_added_sync().await? {
            tracing::debug!("Jellyseerr sync finished immediately");
            return Ok(());
        }

        let job = RemoteJob::new(RECENTLY_ADDED_SYNC_JOB, JobKind::RequestSync);
        await_terminal(
            &job,
            policy,
            || self.sync_status(),
            |status: &SyncStatus| classify_sync(status.running),
        )
        .await?;

        Ok(())
    }
}

pub fn classify_sync(running: bool) -> JobState {
    if running {
        JobState::Pending
    } else {
        JobState::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sync() {
        assert_eq!(classify_sync(true), JobState::Pending);
        assert_eq!(classify_sync(false), JobState::Success);
        assert_eq!(SyncStatus { running: true }.to_string(), "running");
    }

    #[test]
    fn test_jobs_deserialize() {
        let json = r#"[
            {"id": "plex-sync", "name": "Plex Sync", "running": false},
            {"id": "jellyfin-recently-added-sync", "name": "Jellyfin Recently Added Sync", "running": true}
        ]"#;
        let jobs: Vec<JobInfo> = serde_json::from_str(json).unwrap();
        assert!(jobs.iter().any(|j| j.id == RECENTLY_ADDED_SYNC_JOB && j.running));
    }
}
