pub mod clock;
pub mod feed;
pub mod job;
pub mod journal;
pub mod player;
pub mod reconcile;
pub mod repository;
pub mod retry;
pub mod schedule;
pub mod scheduler;
pub mod trigger;

pub use clock::{Clock, SystemClock};
pub use feed::{FetchError, PlayerFeed};
pub use job::{IngestError, IngestJob, RunReport, TriggerReason};
pub use journal::{RunJournal, RunRecord, RunStatus};
pub use player::{Player, PlayerId, RawPlayer, ValidationError};
pub use reconcile::{ReconcileFailure, ReconcileReport, Reconciler, SkippedRecord};
pub use repository::{PlayerRepository, StorageError};
pub use retry::RetryPolicy;
pub use schedule::{CronSchedule, DEFAULT_CRON, ScheduleError, ScheduleTimezone};
pub use scheduler::Scheduler;
pub use trigger::{IngestTrigger, RunOutcome};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
