mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roster::{CronSchedule, IngestJob, IngestTrigger, Reconciler, Scheduler, SystemClock};
use roster_sleeper::{SleeperFeed, SleeperFeedConfig};
use roster_store::PlayerStore;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "roster-ingestor")]
#[command(about = "Keep a local copy of the player roster in sync with the upstream feed")]
struct Cli {
    /// Config file (defaults to ~/.config/roster-ingestor/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest at startup, then nightly on the configured schedule until Ctrl-C
    Run,
    /// Run a single ingestion now and exit
    Ingest,
    /// List stored players
    List {
        /// Filter by team abbreviation
        #[arg(long)]
        team: Option<String>,
        /// Filter by position
        #[arg(long)]
        position: Option<String>,
    },
    /// Show one stored player
    Show {
        /// Upstream player id
        id: String,
    },
    /// Show the last ingestion run and the stored player count
    Status,
}

fn build_store(config: &AppConfig) -> Result<Arc<PlayerStore>> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory: {}", parent.display()))?;
    }

    let store = PlayerStore::open(&path)
        .with_context(|| format!("failed to open database: {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_feed(config: &AppConfig) -> Result<SleeperFeed> {
    let feed = SleeperFeed::new(SleeperFeedConfig {
        sport: config.feed.sport.clone(),
        request_timeout: Duration::from_secs(config.feed.request_timeout_secs),
        base_url: Some(config.feed.base_url.clone()),
        ..SleeperFeedConfig::default()
    })?;
    Ok(feed)
}

fn build_trigger(
    config: &AppConfig,
    store: Arc<PlayerStore>,
    shutdown: CancellationToken,
) -> Result<Arc<IngestTrigger>> {
    let feed = Arc::new(build_feed(config)?);
    let job = IngestJob::new(feed, Reconciler::new(store.clone()))
        .with_retry(config.retry.policy())
        .with_fetch_timeout(config.retry.fetch_timeout())
        .with_shutdown(shutdown);

    let trigger = IngestTrigger::new(job, Arc::new(SystemClock)).with_journal(store);
    Ok(Arc::new(trigger))
}

fn build_scheduler(config: &AppConfig, trigger: Arc<IngestTrigger>) -> Result<Scheduler> {
    let schedule = CronSchedule::parse(&config.schedule.cron, config.schedule.timezone)?;
    Ok(Scheduler::new(trigger, schedule).run_on_startup(config.schedule.run_on_startup))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(path) = cli.database {
        config.database.path = Some(path);
    }
    logging::init(&config.log_level.0);

    match cli.command {
        Command::Run => {
            let shutdown = CancellationToken::new();
            let store = build_store(&config)?;
            let trigger = build_trigger(&config, store, shutdown.clone())?;
            let scheduler = build_scheduler(&config, trigger)?;
            commands::run::run(scheduler, shutdown).await
        }
        Command::Ingest => {
            let store = build_store(&config)?;
            let trigger = build_trigger(&config, store, CancellationToken::new())?;
            commands::ingest::run(&trigger).await
        }
        Command::List { team, position } => {
            let store = build_store(&config)?;
            commands::list::run(store.as_ref(), team.as_deref(), position.as_deref()).await
        }
        Command::Show { id } => {
            let store = build_store(&config)?;
            commands::show::run(store.as_ref(), &id).await
        }
        Command::Status => {
            let store = build_store(&config)?;
            commands::status::run(store.as_ref(), store.as_ref()).await
        }
    }
}
