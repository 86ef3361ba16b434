//! Polling of long-running remote jobs.
//!
//! Torrent conversion on the debrid service, PVR rescan commands, the media
//! server library scan and the request manager sync job are all observed the
//! same way: query the status, classify it, sleep, repeat. The loop is
//! bounded by [`PollPolicy::max_attempts`].

use crate::config::PollSettings;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Classification of one observed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Success,
    Fatal,
}

/// What a remote job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    TorrentAdd,
    Rescan,
    LibraryScan,
    RequestSync,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::TorrentAdd => write!(f, "torrent"),
            JobKind::Rescan => write!(f, "rescan"),
            JobKind::LibraryScan => write!(f, "library scan"),
            JobKind::RequestSync => write!(f, "request sync"),
        }
    }
}

/// A job running on a remote service, identified by the id that service gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteJob {
    pub id: String,
    pub kind: JobKind,
}

impl RemoteJob {
    pub fn new(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

impl fmt::Display for RemoteJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// How often and for how long a job is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

impl From<PollSettings> for PollPolicy {
    fn from(settings: PollSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_secs),
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_secs(settings.initial_delay_secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The job reached a state it can never recover from.
    #[error("{job} failed with status '{status}'")]
    Fatal { job: RemoteJob, status: String },

    /// The attempt budget ran out while the job was still pending.
    #[error("{job} still pending after {attempts} attempts")]
    Timeout { job: RemoteJob, attempts: u32 },

    /// The status query itself failed.
    #[error("failed to query {job}: {source:#}")]
    Query {
        job: RemoteJob,
        #[source]
        source: anyhow::Error,
    },
}

impl PollError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }
}

/// Poll `job` until `classify` reports a terminal state.
///
/// Returns the final status on success. A fatal status, an exhausted attempt
/// budget and a failing query are reported as distinct [`PollError`]s; query
/// errors are not retried.
pub async fn await_terminal<S, F, Fut, C>(
    job: &RemoteJob,
    policy: &PollPolicy,
    mut query: F,
    classify: C,
) -> Result<S, PollError>
where
    S: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<S>>,
    C: Fn(&S) -> JobState,
{
    if !policy.initial_delay.is_zero() {
        debug!("Waiting {:?} before polling {}", policy.initial_delay, job);
        tokio::time::sleep(policy.initial_delay).await;
    }

    for attempt in 1..=policy.max_attempts {
        let status = query().await.map_err(|source| PollError::Query {
            job: job.clone(),
            source,
        })?;

        match classify(&status) {
            JobState::Success => {
                debug!("{} finished with status '{}'", job, status);
                return Ok(status);
            }
            JobState::Fatal => {
                return Err(PollError::Fatal {
                    job: job.clone(),
                    status: status.to_string(),
                });
            }
            JobState::Pending => {
                info!(
                    "{} is {} (attempt {}/{})",
                    job, status, attempt, policy.max_attempts
                );
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    Err(PollError::Timeout {
        job: job.clone(),
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), max_attempts)
    }

    fn classify(status: &String) -> JobState {
        match status.as_str() {
            "done" => JobState::Success,
            "dead" => JobState::Fatal,
            _ => JobState::Pending,
        }
    }

    fn job() -> RemoteJob {
        RemoteJob::new("ABC", JobKind::TorrentAdd)
    }

    #[tokio::test]
    async fn test_pending_until_success() {
        let script = ["pending", "pending", "done", "dead"];
        let calls = AtomicU32::new(0);

        let status = await_terminal(
            &job(),
            &policy(10),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
                async move { Ok(script[n].to_string()) }
            },
            classify,
        )
        .await
        .unwrap();

        assert_eq!(status, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_stops_polling() {
        let script = ["pending", "dead", "done"];
        let calls = AtomicU32::new(0);

        let err = await_terminal(
            &job(),
            &policy(10),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
                async move { Ok(script[n].to_string()) }
            },
            classify,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PollError::Fatal { ref status, .. } if status == "dead"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(err.to_string().contains("torrent ABC"));
    }

    #[tokio::test]
    async fn test_timeout_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let err = await_terminal(
            &job(),
            &policy(4),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("pending".to_string()) }
            },
            classify,
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_query_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let err = await_terminal(
            &job(),
            &policy(10),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<String, _>(anyhow::anyhow!("connection refused")) }
            },
            classify,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PollError::Query { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = PollPolicy::from(PollSettings {
            interval_secs: 5,
            max_attempts: 12,
            initial_delay_secs: 60,
        });
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 12);
        assert_eq!(policy.initial_delay, Duration::from_secs(60));
    }
}
