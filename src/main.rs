use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use harmonia_reco_server::background_jobs::jobs::PrecomputeRecommendationsJob;
use harmonia_reco_server::background_jobs::{JobContext, JobScheduler};
use harmonia_reco_server::config::{AppConfig, CliConfig, FileConfig};
use harmonia_reco_server::engine::RecommendationEngine;
use harmonia_reco_server::history_store::HistoryStore;
use harmonia_reco_server::reco_cache::RecoCache;
use harmonia_reco_server::server::{run_server, ServerState};
use harmonia_reco_server::{CatalogStore, SqliteCatalogStore, SqliteHistoryStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite song catalog database file.
    #[clap(value_parser = parse_path)]
    pub catalog_db: Option<PathBuf>,

    /// Path to the SQLite listening history database file.
    #[clap(value_parser = parse_path)]
    pub history_db: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// Interval in minutes between recommendation precompute runs.
    #[clap(long, default_value_t = 30)]
    pub precompute_interval_minutes: u64,

    /// Optional TOML config file; its values override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        catalog_db: cli_args.catalog_db,
        history_db: cli_args.history_db,
        port: cli_args.port,
        precompute_interval_minutes: cli_args.precompute_interval_minutes,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let catalog_store: Arc<dyn CatalogStore> =
        Arc::new(SqliteCatalogStore::new(&config.catalog_db)?);
    let history_store: Arc<dyn HistoryStore> =
        Arc::new(SqliteHistoryStore::new(&config.history_db)?);
    info!("Catalog opened with {} songs", catalog_store.songs_count());

    let cache = Arc::new(RecoCache::new());
    let engine = Arc::new(RecommendationEngine::new(
        Arc::clone(&catalog_store),
        Arc::clone(&history_store),
        cache,
        config.scoring.clone(),
    ));

    let shutdown_token = CancellationToken::new();
    let (hook_tx, hook_rx) = mpsc::channel(100);

    let job_context = JobContext::new(
        shutdown_token.child_token(),
        Arc::clone(&engine),
        Arc::clone(&history_store),
    );
    let mut scheduler = JobScheduler::new(hook_rx, shutdown_token.clone(), job_context);
    scheduler.register_job(Arc::new(PrecomputeRecommendationsJob::new(
        config.precompute_interval_minutes,
    )));
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run().await;
    });

    // Cancel everything on ctrl-c so jobs stop cleanly.
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received ctrl-c, shutting down");
            signal_token.cancel();
        }
    });

    let state = ServerState::new(engine, hook_tx);
    run_server(state, config.port, shutdown_token.clone()).await?;

    shutdown_token.cancel();
    let _ = scheduler_handle.await;
    info!("Shutdown complete");
    Ok(())
}
