use chrono::{DateTime, Utc};

use crate::job::{IngestError, RunReport, TriggerReason};
use crate::repository::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Persisted summary of one finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub reason: TriggerReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub fetched: u64,
    pub stored: u64,
    pub skipped: u64,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn completed(report: &RunReport) -> Self {
        Self {
            reason: report.reason,
            started_at: report.started_at,
            finished_at: report.finished_at,
            status: RunStatus::Completed,
            fetched: report.fetched,
            stored: report.stored,
            skipped: report.skipped_count(),
            error: None,
        }
    }

    pub fn failed(
        reason: TriggerReason,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        error: &IngestError,
    ) -> Self {
        let (fetched, stored, skipped) = error.progress();
        Self {
            reason,
            started_at,
            finished_at,
            status: RunStatus::Failed,
            fetched,
            stored,
            skipped,
            error: Some(error.to_string()),
        }
    }
}

/// Durable history of ingestion runs.
#[async_trait::async_trait]
pub trait RunJournal: Send + Sync {
    async fn record(&self, run: &RunRecord) -> Result<(), StorageError>;

    /// Most recently started run, if any.
    async fn last_run(&self) -> Result<Option<RunRecord>, StorageError>;
}
