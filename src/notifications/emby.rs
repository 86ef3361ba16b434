use crate::config::ServiceConfig;
use crate::poll::{await_terminal, JobKind, JobState, PollPolicy, RemoteJob};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Key of the library scan in `/ScheduledTasks`.
pub const REFRESH_LIBRARY_TASK: &str = "RefreshLibrary";

/// State reported by an idle scheduled task.
const IDLE: &str = "Idle";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduledTask {
    #[serde(default)]
    pub name: String,
    pub key: String,
    pub state: String,
}

/// Emby / Jellyfin media server.
pub struct EmbyClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EmbyClient {
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

    /// Trigger a full library refresh
    pub async fn refresh_library(&self) -> Result<()> {
        let url = format!("{}/Library/Refresh", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("X-Emby-Token", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Emby refresh failed ({}): {}", status, body);
        }

        Ok(())
    }

    pub async fn scheduled_tasks(&self) -> Result<Vec<ScheduledTask>> {
        let url = format!("{}/ScheduledTasks", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("X-Emby-Token", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Emby scheduled tasks request failed ({})", response.status());
        }

        response
            .json()
            .await
            .context("Invalid scheduled tasks response")
    }

    /// State of the library scan task. A server without one counts as idle.
    pub async fn library_scan_state(&self) -> Result<String> {
        let tasks = self.scheduled_tasks().await?;
        Ok(tasks
            .into_iter()
            .find(|t| t.key == REFRESH_LIBRARY_TASK)
            .map(|t| t.state)
            .unwrap_or_else(|| IDLE.to_string()))
    }

    /// Wait for any running scan, trigger a refresh, then wait for it.
    pub async fn refresh_and_wait(&self, policy: &PollPolicy) -> Result<()> {
        let job = RemoteJob::new(REFRESH_LIBRARY_TASK, JobKind::LibraryScan);

        await_terminal(
            &job,
            policy,
            || self.library_scan_state(),
            |state: &String| classify_scan_state(state),
        )
        .await?;

        self.refresh_library().await?;
        tracing::info!("Emby library refresh triggered");

        let after_refresh = policy.with_initial_delay(policy.interval);
        await_terminal(
            &job,
            &after_refresh,
            || self.library_scan_state(),
            |state: &String| classify_scan_state(state),
        )
        .await?;

        Ok(())
    }
}

/// A scan is finished once its scheduled task is idle again.
pub fn classify_scan_state(state: &str) -> JobState {
    if state == IDLE {
        JobState::Success
    } else {
        JobState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_scan_state() {
        assert_eq!(classify_scan_state("Idle"), JobState::Success);
        assert_eq!(classify_scan_state("Running"), JobState::Pending);
        assert_eq!(classify_scan_state("Cancelling"), JobState::Pending);
    }

    #[test]
    fn test_scheduled_task_deserialize() {
        let json = r#"[{"Name":"Scan media library","State":"Running","Key":"RefreshLibrary","Id":"6330ee8f"}]"#;
        let tasks: Vec<ScheduledTask> = serde_json::from_str(json).unwrap();
        assert_eq!(tasks[0].key, REFRESH_LIBRARY_TASK);
        assert_eq!(tasks[0].state, "Running");
    }
}
