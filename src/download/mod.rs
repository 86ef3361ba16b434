//! Concurrent batch downloads into a staging directory.

mod link;

pub use link::rewrite_download_link;

use crate::config::DownloadConfig;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("download worker stopped unexpectedly: {0}")]
    Worker(String),
}

/// One file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub file_name: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Terminal {
    finished: bool,
    reported: bool,
    error: Option<DownloadError>,
}

/// Live state of one transfer.
///
/// Byte counters are written by the worker and read by the aggregator; the
/// terminal state sits behind a mutex.
#[derive(Debug)]
pub struct DownloadTask {
    pub url: String,
    pub destination: PathBuf,
    bytes_total: AtomicU64,
    bytes_transferred: AtomicU64,
    terminal: Mutex<Terminal>,
}

impl DownloadTask {
    fn new(url: String, destination: PathBuf) -> Self {
        Self {
            url,
            destination,
            bytes_total: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
            terminal: Mutex::new(Terminal::default()),
        }
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total.load(Ordering::Relaxed)
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }

    fn finish(&self, result: Result<(), DownloadError>) {
        let mut terminal = self.terminal.lock();
        terminal.finished = true;
        terminal.error = result.err();
    }
}

enum Observed {
    Running,
    JustFinished,
    Finished,
    Failed(DownloadError),
}

impl DownloadTask {
    fn observe(&self) -> Observed {
        let mut terminal = self.terminal.lock();
        if !terminal.finished {
            return Observed::Running;
        }
        if let Some(err) = terminal.error.take() {
            return Observed::Failed(err);
        }
        if terminal.reported {
            Observed::Finished
        } else {
            terminal.reported = true;
            Observed::JustFinished
        }
    }
}

/// Downloads a batch of files with a fixed number of concurrent transfers.
pub struct BatchDownloader {
    client: Client,
    concurrency: usize,
    progress_interval: Duration,
    edge_host: Option<String>,
}

impl BatchDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            client: Client::new(),
            concurrency: config.concurrency.max(1),
            progress_interval: Duration::from_secs(config.progress_interval_secs.max(1)),
            edge_host: config.edge_host.clone(),
        }
    }

    /// Override the aggregator tick.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Download every request into `destination_dir`.
    ///
    /// Returns the written paths in request order once every transfer is
    /// done. The first failed transfer aborts the remaining ones and is
    /// returned as is.
    pub async fn download_all(
        &self,
        requests: Vec<DownloadRequest>,
        destination_dir: &Path,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: destination_dir.to_path_buf(),
                source,
            })?;

        let mut tasks = Vec::with_capacity(requests.len());
        for request in requests {
            let url = match &self.edge_host {
                Some(edge) => rewrite_download_link(&request.url, edge),
                None => request.url,
            };
            let destination = destination_dir.join(safe_file_name(&request.file_name)?);
            debug!("Download link: {}", url);
            tasks.push(Arc::new(DownloadTask::new(url, destination)));
        }

        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Downloading {} files with {} workers",
            tasks.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();
        for task in &tasks {
            let task = Arc::clone(task);
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            workers.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        task.finish(Err(DownloadError::Worker(e.to_string())));
                        return;
                    }
                };
                let result = transfer(&client, &task).await;
                task.finish(result);
            });
        }

        let result = self.aggregate(&tasks, &mut workers).await;
        if result.is_err() {
            workers.abort_all();
        }
        result?;

        info!("{} downloads completed", tasks.len());
        Ok(tasks.iter().map(|t| t.destination.clone()).collect())
    }

    async fn aggregate(
        &self,
        tasks: &[Arc<DownloadTask>],
        workers: &mut JoinSet<()>,
    ) -> Result<(), DownloadError> {
        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_seen = vec![0u64; tasks.len()];
        let tick_secs = self.progress_interval.as_secs_f64();

        loop {
            ticker.tick().await;

            while let Some(joined) = workers.try_join_next() {
                if let Err(e) = joined {
                    return Err(DownloadError::Worker(e.to_string()));
                }
            }

            let mut pending = 0;
            for (task, last) in tasks.iter().zip(last_seen.iter_mut()) {
                match task.observe() {
                    Observed::Failed(err) => return Err(err),
                    Observed::JustFinished => {
                        info!(
                            "Finished {:?} {:.2} MB",
                            task.destination,
                            task.bytes_transferred() as f64 / BYTES_PER_MB
                        );
                    }
                    Observed::Finished => {}
                    Observed::Running => {
                        pending += 1;
                        let transferred = task.bytes_transferred();
                        let speed = (transferred.saturating_sub(*last)) as f64
                            / BYTES_PER_MB
                            / tick_secs;
                        *last = transferred;
                        info!("{}", progress_line(task, speed));
                    }
                }
            }

            if pending == 0 {
                return Ok(());
            }
        }
    }
}

fn progress_line(task: &DownloadTask, mb_per_sec: f64) -> String {
    let transferred = task.bytes_transferred();
    let total = task.bytes_total();
    let name = task
        .destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if total > 0 {
        format!(
            "Downloading {} {:.2} / {:.2} MB ({:.1}%) {:.2} MB/s",
            name,
            transferred as f64 / BYTES_PER_MB,
            total as f64 / BYTES_PER_MB,
            transferred as f64 / total as f64 * 100.0,
            mb_per_sec
        )
    } else {
        format!(
            "Downloading {} {:.2} MB {:.2} MB/s",
            name,
            transferred as f64 / BYTES_PER_MB,
            mb_per_sec
        )
    }
}

fn safe_file_name(name: &str) -> Result<&str, DownloadError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
    {
        return Err(DownloadError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

async fn transfer(client: &Client, task: &DownloadTask) -> Result<(), DownloadError> {
    let request_error = |source| DownloadError::Request {
        url: task.url.clone(),
        source,
    };
    let io_error = |source| DownloadError::Io {
        path: task.destination.clone(),
        source,
    };

    let response = client.get(&task.url).send().await.map_err(request_error)?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: task.url.clone(),
            status: response.status().as_u16(),
        });
    }

    if let Some(len) = response.content_length() {
        task.bytes_total.store(len, Ordering::Relaxed);
    }

    let mut file = tokio::fs::File::create(&task.destination)
        .await
        .map_err(io_error)?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(request_error)?;
        file.write_all(&chunk).await.map_err(io_error)?;
        task.bytes_transferred
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);
    }

    file.flush().await.map_err(io_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name(" Movie.mkv ").unwrap(), "Movie.mkv");
        assert!(safe_file_name("../etc/passwd").is_err());
        assert!(safe_file_name("").is_err());
        assert!(safe_file_name("..").is_err());
    }

    #[test]
    fn test_observe_reports_finish_once() {
        let task = DownloadTask::new("u".into(), PathBuf::from("/tmp/f"));
        assert!(matches!(task.observe(), Observed::Running));
        task.finish(Ok(()));
        assert!(matches!(task.observe(), Observed::JustFinished));
        assert!(matches!(task.observe(), Observed::Finished));
    }

    #[test]
    fn test_observe_surfaces_error() {
        let task = DownloadTask::new("u".into(), PathBuf::from("/tmp/f"));
        task.finish(Err(DownloadError::Status {
            url: "u".into(),
            status: 503,
        }));
        assert!(matches!(
            task.observe(),
            Observed::Failed(DownloadError::Status { status: 503, .. })
        ));
    }

    #[test]
    fn test_progress_line() {
        let task = DownloadTask::new("u".into(), PathBuf::from("/tmp/Movie.mkv"));
        task.bytes_total.store(4 * 1024 * 1024, Ordering::Relaxed);
        task.bytes_transferred
            .store(1024 * 1024, Ordering::Relaxed);
        assert_eq!(
            progress_line(&task, 0.5),
            "Downloading Movie.mkv 1.00 / 4.00 MB (25.0%) 0.50 MB/s"
        );
    }
}
