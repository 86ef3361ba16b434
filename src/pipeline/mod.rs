//! Release pipeline.
//!
//! `fetch` drives a release from the debrid service into the staging
//! directory; `import` takes a staged release through transcoding, upload,
//! rescans and notifications, then removes the staged files.

pub mod lock;
pub mod staging;

use crate::arr::create_client;
use crate::config::{ArrType, Config};
use crate::debrid::{video_file_ids, DebridClient};
use crate::download::{BatchDownloader, DownloadRequest};
use crate::handoff::Handoff;
use crate::notifications::NotificationManager;
use crate::poll::PollPolicy;
use crate::upload::Uploader;
use anyhow::{Context, Result};
use debridflow_av::{Outcome, Tools};
use debridflow_common::paths::is_deliverable_file;
use debridflow_common::Category;
use lock::TranscodeLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to submit to the debrid service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    Magnet(String),
    File(PathBuf),
}

impl TorrentSource {
    /// Magnet URIs are taken verbatim, anything else is a `.torrent` path.
    pub fn parse(input: &str) -> Self {
        if input.starts_with("magnet:") {
            Self::Magnet(input.to_string())
        } else {
            Self::File(PathBuf::from(input))
        }
    }
}

/// Counters reported at the end of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub transcoded: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub uploaded: usize,
    /// Videos that could not be made deliverable and were left in staging.
    pub retained: Vec<PathBuf>,
}

/// Probe, decide and apply on a blocking thread.
///
/// Returns `Ok(None)` when the file carries a codec that is refused.
pub async fn transcode_file(tools: Tools, path: PathBuf) -> Result<Option<Outcome>> {
    let shown = path.clone();

    let result = tokio::task::spawn_blocking(move || -> debridflow_av::Result<Outcome> {
        let probed = debridflow_av::probe(&tools, &path)?;
        let decision = debridflow_av::decide(&probed)?;
        tracing::info!(
            "{:?}: {} ({} subtitles)",
            path,
            decision.plan.action,
            decision.subtitles.len()
        );
        debridflow_av::apply(&tools, &decision, &path)
    })
    .await?;

    match result {
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) if e.is_unsupported_input() => {
            tracing::warn!("Skipping {:?}: {}", shown, e);
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to transcode {:?}", shown)),
    }
}

pub struct Orchestrator {
    config: Arc<Config>,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Submit, wait, download and import a release.
    ///
    /// The handoff is looked up by `download_id` when given, otherwise by
    /// the torrent hash the debrid service reports.
    pub async fn fetch(
        &self,
        source: TorrentSource,
        download_id: Option<&str>,
    ) -> Result<ImportSummary> {
        let debrid = DebridClient::new(&self.config.debrid)?;

        let added = match &source {
            TorrentSource::Magnet(magnet) => debrid.add_magnet(magnet).await?,
            TorrentSource::File(path) => debrid.add_torrent_file(path).await?,
        };

        let policy = PollPolicy::from(self.config.polling.debrid);
        let waiting = debrid
            .wait_for_file_selection(&added.id, &policy)
            .await?;
        debrid
            .select_files(&added.id, &video_file_ids(&waiting))
            .await?;

        let info = debrid.wait_until_ready(&added.id, &policy).await?;
        tracing::info!("Torrent {} ({}) is ready", info.id, info.filename);

        let links = debrid.unrestrict_all(&info.links).await?;
        let requests = links
            .into_iter()
            .map(|l| DownloadRequest::new(l.download, l.filename))
            .collect();

        let save_dir = staging::release_dir(&self.config.download.staging_dir, &info.filename);
        BatchDownloader::new(&self.config.download)
            .download_all(requests, &save_dir)
            .await
            .context("Download failed")?;

        let download_id = download_id.unwrap_or(&info.hash);
        self.import(&save_dir, download_id).await
    }

    /// Transcode, upload and announce a staged release.
    pub async fn import(&self, save_dir: &Path, download_id: &str) -> Result<ImportSummary> {
        let config = &self.config;

        if !save_dir.is_dir() {
            anyhow::bail!("Staging directory does not exist: {:?}", save_dir);
        }

        let handoff = Handoff::load(&config.handoff.dir, download_id)?;
        tracing::info!(
            "Importing {:?} as {} {} to {}",
            save_dir,
            handoff.category,
            handoff.id,
            handoff.destination
        );

        let tools = Tools::discover(
            config.tools.ffmpeg_path.as_deref(),
            config.tools.ffprobe_path.as_deref(),
        )?;
        let rclone = debridflow_av::tools::get_tool_path(
            "rclone",
            config.tools.rclone_path.as_deref(),
        )?;

        let mut summary = ImportSummary::default();

        let videos = staging::scan_videos(save_dir)?;
        if videos.is_empty() {
            tracing::warn!("No video files found in {:?}", save_dir);
        } else {
            let _lock = TranscodeLock::acquire(&config.handoff.dir).await?;
            for video in videos {
                tracing::info!("Converting video: {:?}", video);
                match transcode_file(tools.clone(), video.clone()).await? {
                    Some(outcome) => {
                        if outcome.rewritten {
                            summary.transcoded += 1;
                        } else {
                            summary.unchanged += 1;
                        }
                        if !is_deliverable_file(&outcome.output) {
                            tracing::warn!(
                                "{:?} is not an MP4 after conversion, leaving it in place",
                                outcome.output
                            );
                            summary.retained.push(outcome.output);
                        }
                    }
                    None => {
                        summary.skipped += 1;
                        summary.retained.push(video);
                    }
                }
            }
        }

        let deliverables = staging::prune(save_dir, &summary.retained)?;
        summary.uploaded = deliverables.len();
        Uploader::new(rclone, config.upload.batch_size)
            .upload_all(deliverables, &handoff.destination)
            .await?;

        self.rescan(&handoff).await;
        let notifications = NotificationManager::new(config);
        if notifications.has_targets() {
            notifications.notify_library_updated().await;
        } else {
            tracing::debug!("No notification targets configured");
        }

        if summary.retained.is_empty() {
            cleanup(save_dir, &config.handoff.dir, download_id);
        } else {
            tracing::warn!(
                "Keeping {:?} and its handoff, {} file(s) were not imported",
                save_dir,
                summary.retained.len()
            );
        }

        tracing::info!(
            "Import finished: {} transcoded, {} unchanged, {} skipped, {} uploaded",
            summary.transcoded,
            summary.unchanged,
            summary.skipped,
            summary.uploaded
        );
        Ok(summary)
    }

    /// Rescan the PVR owning the release. Errors are logged.
    async fn rescan(&self, handoff: &Handoff) {
        let arr_type = match handoff.category {
            Category::Movie => ArrType::Radarr,
            Category::Series => ArrType::Sonarr,
        };

        let Some(arr) = self.config.arr(arr_type) else {
            tracing::warn!("No enabled {} configured, skipping rescan", handoff.category.pvr_name());
            return;
        };
        if !arr.auto_rescan {
            return;
        }

        let policy = PollPolicy::from(self.config.polling.arr);
        match create_client(arr).rescan_and_wait(handoff.id, &policy).await {
            Ok(()) => {
                if handoff.category == Category::Movie {
                    NotificationManager::new(&self.config)
                        .notify_subtitles(handoff.id)
                        .await;
                }
            }
            Err(e) => tracing::error!("{:#}", e),
        }
    }
}

fn cleanup(save_dir: &Path, handoff_dir: &Path, download_id: &str) {
    match std::fs::remove_dir_all(save_dir) {
        Ok(()) => tracing::info!("Removed directory: {:?}", save_dir),
        Err(e) => tracing::warn!("Failed to remove {:?}: {}", save_dir, e),
    }

    match Handoff::remove(handoff_dir, download_id) {
        Ok(()) => tracing::info!("Removed handoff for {}", download_id),
        Err(e) => tracing::warn!("{:#}", e),
    }
}
