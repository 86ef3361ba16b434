use crate::config::{ArrConfig, ArrType};
use crate::poll::{await_terminal, JobKind, JobState, PollError, PollPolicy, RemoteJob};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection timeout for Arr API requests
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// A queued or finished `/api/v3/command` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// Common trait for *arr API clients
#[async_trait::async_trait]
pub trait ArrClient: Send + Sync {
    /// Name from the configuration, for log lines.
    fn name(&self) -> &str;

    /// Queue a rescan for a specific item and return the command id
    async fn rescan(&self, item_id: i64) -> Result<i64>;

    /// Current status of a queued command
    async fn command_status(&self, command_id: i64) -> Result<String>;

    /// Queue a rescan and wait for the command to finish.
    async fn rescan_and_wait(&self, item_id: i64, policy: &PollPolicy) -> Result<()> {
        let command_id = self.rescan(item_id).await?;
        tracing::info!(
            "{} rescan of item {} queued as command {}",
            self.name(),
            item_id,
            command_id
        );

        let job = RemoteJob::new(command_id.to_string(), JobKind::Rescan);
        await_terminal(
            &job,
            policy,
            || self.command_status(command_id),
            |status: &String| classify_command_status(status),
        )
        .await
        .map_err(|e: PollError| anyhow::Error::new(e))
        .with_context(|| format!("{} rescan of item {} did not complete", self.name(), item_id))?;

        tracing::info!("{} rescan of item {} completed", self.name(), item_id);
        Ok(())
    }
}

/// Create an appropriate client based on config
pub fn create_client(config: &ArrConfig) -> Box<dyn ArrClient> {
    match config.arr_type {
        ArrType::Radarr => Box::new(RadarrClient::new(config)),
        ArrType::Sonarr => Box::new(SonarrClient::new(config)),
    }
}

/// Map a PVR command status onto the poller's states.
pub fn classify_command_status(status: &str) -> JobState {
    match status.to_ascii_lowercase().as_str() {
        "failed" | "aborted" | "cancelled" => JobState::Fatal,
        "completed" => JobState::Success,
        _ => JobState::Pending,
    }
}

struct BaseArrClient {
    client: Client,
    name: String,
    base_url: String,
    api_key: String,
}

impl BaseArrClient {
    fn new(config: &ArrConfig) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            name: config.name.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.client
            .get(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context(format!("Failed to GET {}", path))
    }

    async fn post_command<T: Serialize>(&self, command: &T, context_msg: &str) -> Result<i64> {
        let context_msg = context_msg.to_string();
        let response = self
            .client
            .post(self.url("/command"))
            .header("X-Api-Key", &self.api_key)
            .json(command)
            .send()
            .await
            .context(context_msg.clone())?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            anyhow::bail!("{}: {}", context_msg, error);
        }

        let command: CommandResponse = response.json().await.context(context_msg)?;
        Ok(command.id)
    }

    async fn command_status(&self, command_id: i64) -> Result<String> {
        let response = self.get(&format!("/command/{}", command_id)).await?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to get command {} status: HTTP {}",
                command_id,
                response.status()
            );
        }

        let command: CommandResponse = response
            .json()
            .await
            .context("Invalid command status response")?;
        Ok(command.status)
    }
}

pub struct RadarrClient(BaseArrClient);

impl RadarrClient {
    pub fn new(config: &ArrConfig) -> Self {
        Self(BaseArrClient::new(config))
    }
}

#[async_trait::async_trait]
impl ArrClient for RadarrClient {
    fn name(&self) -> &str {
        &self.0.name
    }

    async fn rescan(&self, movie_id: i64) -> Result<i64> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RescanCommand {
            name: &'static str,
            movie_id: i64,
        }

        let command = RescanCommand {
            name: "RescanMovie",
            movie_id,
        };

        self.0
            .post_command(&command, "Failed to trigger Radarr rescan")
            .await
    }

    async fn command_status(&self, command_id: i64) -> Result<String> {
        self.0.command_status(command_id).await
    }
}

pub struct SonarrClient(BaseArrClient);

impl SonarrClient {
    pub fn new(config: &ArrConfig) -> Self {
        Self(BaseArrClient::new(config))
    }
}

#[async_trait::async_trait]
impl ArrClient for SonarrClient {
    fn name(&self) -> &str {
        &self.0.name
    }

    async fn rescan(&self, series_id: i64) -> Result<i64> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RescanCommand {
            name: &'static str,
            series_id: i64,
        }

        let command = RescanCommand {
            name: "RescanSeries",
            series_id,
        };

        self.0
            .post_command(&command, "Failed to trigger Sonarr rescan")
            .await
    }

    async fn command_status(&self, command_id: i64) -> Result<String> {
        self.0.command_status(command_id).await
    }
}
