use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::job::{IngestError, IngestJob, RunReport, TriggerReason};
use crate::journal::{RunJournal, RunRecord};

/// What happened when the trigger fired.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    Failed(IngestError),
    /// Another run held the gate; nothing was fetched or written.
    Skipped,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Starts ingestion runs, at most one at a time.
///
/// A fire that arrives while a run is in progress is skipped, not queued.
/// Failures are logged and returned; they never escape as panics.
pub struct IngestTrigger {
    job: IngestJob,
    clock: Arc<dyn Clock>,
    journal: Option<Arc<dyn RunJournal>>,
    gate: Mutex<()>,
    running: AtomicBool,
    runs_started: AtomicU64,
    runs_skipped: AtomicU64,
}

impl IngestTrigger {
    pub fn new(job: IngestJob, clock: Arc<dyn Clock>) -> Self {
        Self {
            job,
            clock,
            journal: None,
            gate: Mutex::new(()),
            running: AtomicBool::new(false),
            runs_started: AtomicU64::new(0),
            runs_skipped: AtomicU64::new(0),
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn RunJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of runs that acquired the gate.
    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::SeqCst)
    }

    /// Number of fires dropped because a run was already in progress.
    pub fn runs_skipped(&self) -> u64 {
        self.runs_skipped.load(Ordering::SeqCst)
    }

    /// Whether a run currently holds the gate. Never touches the gate itself.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn fire(&self, reason: TriggerReason) -> RunOutcome {
        let Ok(_guard) = self.gate.try_lock() else {
            self.runs_skipped.fetch_add(1, Ordering::SeqCst);
            warn!(%reason, "ingestion already running, skipping");
            return RunOutcome::Skipped;
        };

        let _running = RunningFlag::set(&self.running);
        self.runs_started.fetch_add(1, Ordering::SeqCst);
        let started_at = self.clock.now();
        let timer = Instant::now();
        info!(%reason, feed = self.job.feed_label(), "player ingestion started");

        match self.job.run(reason, self.clock.as_ref()).await {
            Ok(report) => {
                let duration_ms = timer.elapsed().as_millis() as u64;
                if report.is_partial() {
                    warn!(
                        %reason,
                        fetched = report.fetched,
                        stored = report.stored,
                        skipped = report.skipped_count(),
                        duration_ms,
                        "player ingestion completed with skipped records"
                    );
                } else {
                    info!(
                        %reason,
                        fetched = report.fetched,
                        stored = report.stored,
                        skipped = 0u64,
                        duration_ms,
                        "player ingestion completed"
                    );
                }
                self.journal(RunRecord::completed(&report)).await;
                RunOutcome::Completed(report)
            }
            Err(e) => {
                let duration_ms = timer.elapsed().as_millis() as u64;
                let (fetched, stored, skipped) = e.progress();
                error!(
                    %reason,
                    error = %e,
                    fetched,
                    stored,
                    skipped,
                    duration_ms,
                    "player ingestion failed"
                );
                self.journal(RunRecord::failed(reason, started_at, self.clock.now(), &e))
                    .await;
                RunOutcome::Failed(e)
            }
        }
    }

    async fn journal(&self, record: RunRecord) {
        if let Some(journal) = &self.journal
            && let Err(e) = journal.record(&record).await
        {
            warn!(error = %e, "failed to record ingestion run");
        }
    }
}

/// Raised while a run holds the gate; lowered on drop, even on panic.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::SystemClock;
    use crate::feed::FetchError;
    use crate::journal::RunStatus;
    use crate::reconcile::Reconciler;
    use crate::repository::PlayerRepository;
    use crate::retry::RetryPolicy;
    use crate::test_support::{
        BlockingFeed, InMemoryJournal, InMemoryRepository, ScriptedFeed, raw_player,
    };

    fn trigger_for<F: crate::feed::PlayerFeed + 'static>(
        feed: Arc<F>,
        repo: Arc<InMemoryRepository>,
    ) -> IngestTrigger {
        let job = IngestJob::new(feed, Reconciler::new(repo)).with_retry(RetryPolicy::none());
        IngestTrigger::new(job, Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn fire_runs_ingestion() {
        let repo = Arc::new(InMemoryRepository::new());
        let feed = Arc::new(ScriptedFeed::returning(vec![raw_player("1", "KC")]));
        let trigger = trigger_for(feed, repo.clone());

        let outcome = trigger.fire(TriggerReason::Startup).await;

        assert!(outcome.is_completed());
        assert_eq!(trigger.runs_started(), 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn failure_is_contained_and_next_run_proceeds() {
        let repo = Arc::new(InMemoryRepository::new());
        let feed = Arc::new(ScriptedFeed::returning(vec![raw_player("1", "KC")]));
        feed.push_error(FetchError::Network("dns failure".into()));
        let trigger = trigger_for(feed, repo.clone());

        let first = trigger.fire(TriggerReason::Startup).await;
        assert!(matches!(first, RunOutcome::Failed(IngestError::Fetch(_))));
        assert!(repo.is_empty());

        let second = trigger.fire(TriggerReason::Scheduled).await;
        assert!(second.is_completed());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_fire_is_skipped() {
        let repo = Arc::new(InMemoryRepository::new());
        let feed = Arc::new(BlockingFeed::new(vec![raw_player("1", "KC")]));
        let trigger = Arc::new(trigger_for(feed.clone(), repo.clone()));

        let first = tokio::spawn({
            let trigger = trigger.clone();
            async move { trigger.fire(TriggerReason::Startup).await }
        });
        feed.wait_until_entered().await;
        assert!(trigger.is_running());

        let second = trigger.fire(TriggerReason::Scheduled).await;
        assert!(second.is_skipped());

        feed.release();
        let first = tokio::time::timeout(Duration::from_secs(5), first)
            .await
            .unwrap()
            .unwrap();

        assert!(first.is_completed());
        assert!(!trigger.is_running());
        assert_eq!(feed.calls(), 1);
        assert_eq!(trigger.runs_started(), 1);
        assert_eq!(trigger.runs_skipped(), 1);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn runs_are_journaled() {
        let repo = Arc::new(InMemoryRepository::new());
        let journal = Arc::new(InMemoryJournal::new());
        let feed = Arc::new(ScriptedFeed::returning(vec![raw_player("1", "KC")]));
        feed.push_error(FetchError::Malformed("truncated body".into()));
        let trigger = trigger_for(feed, repo).with_journal(journal.clone());

        trigger.fire(TriggerReason::Startup).await;
        trigger.fire(TriggerReason::Manual).await;

        let records = journal.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, RunStatus::Failed);
        assert!(records[0].error.as_deref().unwrap().contains("truncated body"));
        assert_eq!(records[1].status, RunStatus::Completed);
        assert_eq!(records[1].reason, TriggerReason::Manual);
        assert_eq!(records[1].stored, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn polling_is_running_never_causes_a_skip() {
        let repo = Arc::new(InMemoryRepository::new());
        let feed = Arc::new(ScriptedFeed::returning(vec![raw_player("1", "KC")]));
        let trigger = Arc::new(trigger_for(feed, repo));

        let poller = tokio::spawn({
            let trigger = trigger.clone();
            async move {
                for _ in 0..10_000 {
                    let _ = trigger.is_running();
                    tokio::task::yield_now().await;
                }
            }
        });

        for _ in 0..200 {
            assert!(trigger.fire(TriggerReason::Manual).await.is_completed());
        }
        poller.await.unwrap();

        assert_eq!(trigger.runs_started(), 200);
        assert_eq!(trigger.runs_skipped(), 0);
        assert!(!trigger.is_running());
    }

    #[tokio::test]
    async fn storage_failure_journals_partial_progress() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.fail_after(2);
        let journal = Arc::new(InMemoryJournal::new());
        let mut missing = raw_player("x", "KC");
        missing.external_id = None;
        let feed = Arc::new(ScriptedFeed::returning(vec![
            raw_player("1", "KC"),
            missing,
            raw_player("2", "KC"),
            raw_player("3", "KC"),
        ]));
        let trigger = trigger_for(feed, repo.clone()).with_journal(journal.clone());

        let outcome = trigger.fire(TriggerReason::Scheduled).await;

        let RunOutcome::Failed(error) = outcome else {
            panic!("expected failed run, got {outcome:?}");
        };
        assert_eq!(error.progress(), (4, 2, 1));
        assert!(!trigger.is_running());

        let records = journal.records();
        assert_eq!(records.len(), 1);
        let run = &records[0];
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.fetched, 4);
        assert_eq!(run.stored, repo.len() as u64);
        assert_eq!(run.skipped, 1);
        assert!(run.error.as_deref().unwrap().contains("connection lost"));
    }
}
