use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::job::TriggerReason;
use crate::schedule::CronSchedule;
use crate::trigger::IngestTrigger;

/// Owns the recurring ingestion task.
///
/// Fires once at startup (unless disabled), then on every tick of the cron
/// schedule until shutdown. Each fire runs on its own task so the timer keeps
/// its cadence; overlap is resolved by the trigger's gate.
pub struct Scheduler {
    trigger: Arc<IngestTrigger>,
    schedule: CronSchedule,
    run_on_startup: bool,
}

impl Scheduler {
    pub fn new(trigger: Arc<IngestTrigger>, schedule: CronSchedule) -> Self {
        Self {
            trigger,
            schedule,
            run_on_startup: true,
        }
    }

    pub fn run_on_startup(mut self, enabled: bool) -> Self {
        self.run_on_startup = enabled;
        self
    }

    /// Run until `shutdown` is cancelled, then wait for in-flight runs.
    pub async fn run(&self, shutdown: CancellationToken) {
        let clock = self.trigger.clock().clone();
        let mut in_flight = JoinSet::new();

        info!(
            cron = self.schedule.expression(),
            timezone = ?self.schedule.timezone(),
            "ingestion scheduler started"
        );

        if self.run_on_startup {
            self.spawn_fire(&mut in_flight, TriggerReason::Startup);
        }

        loop {
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    error!(error = %e, "ingestion task panicked");
                }
            }

            let Some(next) = self.schedule.next_after(clock.now()) else {
                warn!(
                    cron = self.schedule.expression(),
                    "schedule has no upcoming fire time"
                );
                shutdown.cancelled().await;
                break;
            };
            debug!(next = %next, "next ingestion scheduled");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = clock.sleep_until(next) => {
                    self.spawn_fire(&mut in_flight, TriggerReason::Scheduled);
                }
            }
        }

        info!(in_flight = in_flight.len(), "ingestion scheduler stopping");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "ingestion task panicked");
            }
        }
    }

    fn spawn_fire(&self, in_flight: &mut JoinSet<()>, reason: TriggerReason) {
        let trigger = Arc::clone(&self.trigger);
        in_flight.spawn(async move {
            trigger.fire(reason).await;
        });
    }
}
