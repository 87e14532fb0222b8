use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use storybox::config;
use storybox::db;
use storybox::feed::WordPressClient;
use storybox::store::SqliteStore;
use storybox::sync::Syncer;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Keep the local story mirror in sync with the remote feed"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run a single reconciliation pass and exit
    #[arg(long)]
    once: bool,

    /// Override app.sync_interval_secs
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let feed = WordPressClient::from_config(&cfg)?;
    let store = Arc::new(SqliteStore::new(pool));
    let syncer = Syncer::new(Arc::new(feed), store.clone(), store);

    if args.once {
        let report = syncer.run_pass().await?;
        info!(status = %report.status, after = report.after, "single pass finished");
        return Ok(());
    }

    let secs = args.interval_secs.unwrap_or(cfg.app.sync_interval_secs).max(1);
    let period = Duration::from_secs(secs);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = period.as_secs(), "starting story syncer");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match syncer.run_pass().await {
                    Ok(report) => info!(
                        status = %report.status,
                        new_stories = report.new_stories,
                        "pass finished"
                    ),
                    Err(err) => error!(?err, "sync pass failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
