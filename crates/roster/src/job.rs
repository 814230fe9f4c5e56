use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::feed::{FetchError, PlayerFeed};
use crate::player::RawPlayer;
use crate::reconcile::{Reconciler, SkippedRecord};
use crate::repository::StorageError;
use crate::retry::RetryPolicy;

/// Why an ingestion run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerReason {
    Startup,
    Scheduled,
    Manual,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "startup" => Some(Self::Startup),
            "scheduled" => Some(Self::Scheduled),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that aborted before finishing its batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("storage failed after {stored} of {fetched} records: {source}")]
    Storage {
        source: StorageError,
        fetched: u64,
        stored: u64,
        skipped: u64,
    },
}

impl IngestError {
    /// Records fetched, stored and skipped before the run aborted.
    pub fn progress(&self) -> (u64, u64, u64) {
        match self {
            Self::Fetch(_) => (0, 0, 0),
            Self::Storage {
                fetched,
                stored,
                skipped,
                ..
            } => (*fetched, *stored, *skipped),
        }
    }
}

/// Outcome of a run that got through fetch and reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub reason: TriggerReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: u64,
    pub stored: u64,
    pub skipped: Vec<SkippedRecord>,
}

impl RunReport {
    pub fn skipped_count(&self) -> u64 {
        self.skipped.len() as u64
    }

    /// True when some records were dropped as malformed.
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// One ingestion pass: fetch the roster, then reconcile it into storage.
pub struct IngestJob {
    feed: Arc<dyn PlayerFeed>,
    reconciler: Reconciler,
    retry: RetryPolicy,
    fetch_timeout: Duration,
    shutdown: CancellationToken,
}

impl IngestJob {
    pub fn new(feed: Arc<dyn PlayerFeed>, reconciler: Reconciler) -> Self {
        Self {
            feed,
            reconciler,
            retry: RetryPolicy::default(),
            fetch_timeout: Duration::from_secs(30),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Abandon retry backoff once `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn feed_label(&self) -> &str {
        self.feed.label()
    }

    /// Execute the pipeline. Nothing is written unless the fetch succeeds.
    pub async fn run(
        &self,
        reason: TriggerReason,
        clock: &dyn Clock,
    ) -> Result<RunReport, IngestError> {
        let started_at = clock.now();
        let records = self.fetch_with_retry().await?;
        let fetched = records.len() as u64;
        info!(feed = self.feed.label(), fetched, "fetched roster");

        let report = self
            .reconciler
            .reconcile(records)
            .await
            .map_err(|failure| IngestError::Storage {
                source: failure.error,
                fetched,
                stored: failure.partial.stored,
                skipped: failure.partial.skipped_count(),
            })?;

        Ok(RunReport {
            reason,
            started_at,
            finished_at: clock.now(),
            fetched,
            stored: report.stored,
            skipped: report.skipped,
        })
    }

    async fn fetch_with_retry(&self) -> Result<Vec<RawPlayer>, FetchError> {
        let attempts = self.retry.attempts();
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.fetch_timeout, self.feed.fetch_all()).await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
            };

            match result {
                Ok(records) => return Ok(records),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    let hint = match &e {
                        FetchError::RateLimited { retry_after } => *retry_after,
                        _ => None,
                    };
                    let delay = self.retry.delay_after(attempt, hint);
                    warn!(
                        feed = self.feed.label(),
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "fetch failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => {
                            warn!(
                                feed = self.feed.label(),
                                attempt,
                                "shutdown requested, abandoning retries"
                            );
                            return Err(e);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
