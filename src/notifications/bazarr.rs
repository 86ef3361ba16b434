use crate::config::ServiceConfig;
use anyhow::Result;
use reqwest::Client;
use std::time::Duration;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Bazarr webhook client. `url` is the webhook base, e.g.
/// `http://bazarr:6767/api/webhooks`.
pub struct BazarrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BazarrClient {
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

    /// Ask Bazarr to search subtitles for a Radarr movie.
    pub async fn search_movie_subtitles(&self, movie_id: i64) -> Result<()> {
        let url = format!("{}/radarr", self.base_url);
        let movie_id = movie_id.to_string();

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .form(&[("radarr_moviefile_id", movie_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Bazarr subtitle search failed ({}): {}", status, body);
        }

        Ok(())
    }
}
