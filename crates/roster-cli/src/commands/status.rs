use anyhow::Result;
use roster::{PlayerRepository, RunJournal, RunStatus};

use super::format;

pub async fn run(repo: &dyn PlayerRepository, journal: &dyn RunJournal) -> Result<()> {
    let count = repo.find_all().await?.len();

    match journal.last_run().await? {
        Some(run) => {
            println!("Last run:  {} ({})", format::timestamp(run.started_at), run.reason);
            println!("Duration:  {}", format::duration(run.finished_at - run.started_at));
            match run.status {
                RunStatus::Completed => println!(
                    "Result:    completed, {} fetched, {} stored, {} skipped",
                    run.fetched, run.stored, run.skipped
                ),
                RunStatus::Failed => println!(
                    "Result:    failed after {} stored ({} fetched, {} skipped): {}",
                    run.stored,
                    run.fetched,
                    run.skipped,
                    run.error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
        None => println!("Last run:  never"),
    }

    println!("Players:   {count}");

    Ok(())
}
