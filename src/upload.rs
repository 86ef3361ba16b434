//! Upload of processed files with rclone.

use anyhow::{Context, Result};
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Condensed `rclone -P` statistics line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub transferred: String,
    pub percent: String,
    pub speed: String,
    pub eta: String,
}

impl fmt::Display for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at {}, ETA {}",
            self.transferred, self.percent, self.speed, self.eta
        )
    }
}

fn progress_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Transferred:\s*(.+?),\s*(\d+%|-),\s*([^,]+?),\s*ETA\s*(\S+)").ok()
    })
    .as_ref()
}

/// Parse the byte-count line of rclone's progress output.
///
/// The file-count line (`Transferred: 0 / 1, 0%`) carries no ETA and is
/// ignored.
pub fn parse_progress(line: &str) -> Option<TransferProgress> {
    if !line.contains("Transferred:") || !line.contains("ETA") {
        return None;
    }

    let caps = progress_regex()?.captures(line)?;
    Some(TransferProgress {
        transferred: caps[1].trim().to_string(),
        percent: caps[2].to_string(),
        speed: caps[3].trim().to_string(),
        eta: caps[4].to_string(),
    })
}

/// Run `op` over `items` in groups of `batch_size`.
///
/// All tasks of a group run concurrently and group k+1 only starts once
/// every task of group k has finished. Errors of a group are reported after
/// its barrier; later groups are not started.
pub async fn run_in_batches<T, F, Fut>(items: Vec<T>, batch_size: usize, op: F) -> Result<usize>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let batch_size = batch_size.max(1);
    let mut items = items.into_iter().peekable();
    let mut batches = 0;

    while items.peek().is_some() {
        let batch: Vec<T> = items.by_ref().take(batch_size).collect();
        batches += 1;
        debug!("Starting batch {} with {} tasks", batches, batch.len());

        let results = futures::future::join_all(batch.into_iter().map(&op)).await;

        let mut errors = results.into_iter().filter_map(|r| r.err()).collect::<Vec<_>>();
        if !errors.is_empty() {
            let count = errors.len();
            let first = errors.remove(0);
            return Err(first.context(format!(
                "{} task(s) of batch {} failed",
                count, batches
            )));
        }
    }

    Ok(batches)
}

/// Copies files to an rclone remote.
pub struct Uploader {
    rclone: PathBuf,
    batch_size: usize,
}

impl Uploader {
    pub fn new(rclone: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            rclone: rclone.into(),
            batch_size,
        }
    }

    /// `rclone copy <file> <destination> -P`, logging condensed progress.
    pub async fn upload_file(&self, file: &Path, destination: &str) -> Result<()> {
        info!("Uploading {:?} to {}", file, destination);

        let mut child = Command::new(&self.rclone)
            .arg("copy")
            .arg(file)
            .arg(destination)
            .arg("-P")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start rclone at {:?}", self.rclone))?;

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let progress = async {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    if let Some(progress) = parse_progress(&line) {
                        info!("{}: {}", name, progress);
                    }
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let errors = async {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };

        // stdout and stderr are read concurrently
        let (progress, errors) = tokio::join!(progress, errors);
        progress.context("Failed to read rclone output")?;
        let errors = errors.context("Failed to read rclone errors")?;

        let status = child.wait().await.context("Failed to wait for rclone")?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&errors);
            anyhow::bail!(
                "rclone failed to upload {:?} ({}): {}",
                file,
                status,
                stderr.trim()
            );
        }

        info!("Uploaded {}", name);
        Ok(())
    }

    /// Upload every file to `destination`, batch by batch.
    pub async fn upload_all(&self, files: Vec<PathBuf>, destination: &str) -> Result<()> {
        let total = files.len();
        let batches = run_in_batches(files, self.batch_size, |file| async move {
            self.upload_file(&file, destination).await
        })
        .await?;

        info!("Uploaded {} files in {} batches", total, batches);
        Ok(())
    }
}
