use std::sync::Arc;

use tracing::{debug, warn};

use crate::player::{RawPlayer, ValidationError};
use crate::repository::{PlayerRepository, StorageError};

/// A record that was dropped during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Zero-based position of the record in the fetched batch.
    pub index: usize,
    pub reason: ValidationError,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub stored: u64,
    pub skipped: Vec<SkippedRecord>,
}

/// A storage error that stopped the pass, with the progress made before it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct ReconcileFailure {
    pub error: StorageError,
    pub partial: ReconcileReport,
}

impl ReconcileReport {
    pub fn skipped_count(&self) -> u64 {
        self.skipped.len() as u64
    }
}

/// Maps raw feed records onto stored players.
pub struct Reconciler {
    repository: Arc<dyn PlayerRepository>,
}

impl Reconciler {
    pub fn new(repository: Arc<dyn PlayerRepository>) -> Self {
        Self { repository }
    }

    /// Normalize and upsert every record in `records`.
    ///
    /// Records that fail validation are skipped and reported. The first
    /// storage error stops the pass; rows written before it stay written.
    pub async fn reconcile(
        &self,
        records: Vec<RawPlayer>,
    ) -> Result<ReconcileReport, ReconcileFailure> {
        let mut report = ReconcileReport::default();

        for (index, record) in records.into_iter().enumerate() {
            let player = match record.normalize() {
                Ok(player) => player,
                Err(reason) => {
                    warn!(index, %reason, "skipping player record");
                    report.skipped.push(SkippedRecord { index, reason });
                    continue;
                }
            };

            if let Err(error) = self.repository.save(&player).await {
                return Err(ReconcileFailure {
                    error,
                    partial: report,
                });
            }
            debug!(id = %player.external_id, "upserted player");
            report.stored += 1;
        }

        Ok(report)
    }
}
