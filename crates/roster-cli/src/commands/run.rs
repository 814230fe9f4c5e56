use anyhow::Result;
use roster::Scheduler;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drive the scheduler until Ctrl-C, then let in-flight runs finish.
///
/// `shutdown` is shared with the ingest job so a pending retry backoff is
/// cut short as well.
pub async fn run(scheduler: Scheduler, shutdown: CancellationToken) -> Result<()> {
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C; shutting down"),
        }
        signal_token.cancel();
    });

    scheduler.run(shutdown).await;
    Ok(())
}
