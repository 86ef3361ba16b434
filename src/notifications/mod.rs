pub mod bazarr;
pub mod emby;
pub mod jellyseerr;

pub use bazarr::BazarrClient;
pub use emby::EmbyClient;
pub use jellyseerr::JellyseerrClient;

use crate::config::{Config, ServiceConfig};
use crate::poll::PollPolicy;

/// Manages the downstream services told about a finished import
/// (Bazarr, Emby, Jellyseerr).
pub struct NotificationManager {
    bazarr: Option<BazarrClient>,
    emby: Option<EmbyClient>,
    jellyseerr: Option<JellyseerrClient>,
    emby_poll: PollPolicy,
    jellyseerr_poll: PollPolicy,
}

fn enabled(service: &Option<ServiceConfig>) -> Option<&ServiceConfig> {
    service.as_ref().filter(|s| s.enabled)
}

impl NotificationManager {
    pub fn new(config: &Config) -> Self {
        Self {
            bazarr: enabled(&config.bazarr).map(BazarrClient::new),
            emby: enabled(&config.emby).map(EmbyClient::new),
            jellyseerr: enabled(&config.jellyseerr).map(JellyseerrClient::new),
            emby_poll: config.polling.emby.into(),
            jellyseerr_poll: config.polling.jellyseerr.into(),
        }
    }

    /// Ask Bazarr to fetch subtitles for a movie.
    /// Errors are logged but not propagated.
    pub async fn notify_subtitles(&self, movie_id: i64) {
        let Some(bazarr) = &self.bazarr else {
            return;
        };

        match bazarr.search_movie_subtitles(movie_id).await {
            Ok(()) => tracing::info!("Bazarr subtitle search triggered for movie {}", movie_id),
            Err(e) => tracing::warn!("Failed to notify Bazarr: {:#}", e),
        }
    }

    /// Refresh the media server library, then sync the request manager.
    /// Errors are logged but not propagated.
    pub async fn notify_library_updated(&self) {
        if let Some(emby) = &self.emby {
            match emby.refresh_and_wait(&self.emby_poll).await {
                Ok(()) => tracing::info!("Emby library scan finished"),
                Err(e) => tracing::warn!("Failed to refresh Emby library: {:#}", e),
            }
        }

        if let Some(jellyseerr) = &self.jellyseerr {
            match jellyseerr.sync_and_wait(&self.jellyseerr_poll).await {
                Ok(()) => tracing::info!("Jellyseerr sync finished"),
                Err(e) => tracing::warn!("Failed to sync Jellyseerr: {:#}", e),
            }
        }
    }

    /// Check if there are any enabled notification targets
    pub fn has_targets(&self) -> bool {
        self.bazarr.is_some() || self.emby.is_some() || self.jellyseerr.is_some()
    }
}
