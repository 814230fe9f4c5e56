use anyhow::{Result, bail};
use roster::{IngestTrigger, RunOutcome, TriggerReason};

use super::format;

/// Run one ingestion now and print the report.
pub async fn run(trigger: &IngestTrigger) -> Result<()> {
    println!("Ingesting players...");

    match trigger.fire(TriggerReason::Manual).await {
        RunOutcome::Completed(report) => {
            for skipped in &report.skipped {
                eprintln!("warning: record {} skipped: {}", skipped.index, skipped.reason);
            }
            println!("{}", format::report_line(&report));
            Ok(())
        }
        RunOutcome::Failed(e) => bail!("ingestion failed: {e}"),
        RunOutcome::Skipped => bail!("an ingestion run is already in progress"),
    }
}
