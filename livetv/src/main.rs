use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use livetv_core::{
    bootstrap::{init_engine, load_config, load_config_from, Engine},
    logging,
    models::GenreFilter,
};

#[derive(Parser, Debug)]
#[command(name = "livetv")]
#[command(about = "Live TV catalog aggregation engine", long_about = None)]
struct Args {
    /// Config file (YAML/TOML); defaults to LIVETV_CONFIG_PATH or ./livetv.yaml
    #[arg(long, short, env = "LIVETV_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Keep the catalog refreshed until interrupted
    Run,
    /// List the channels of one grouping (e.g. GR or iptv-GR)
    Catalog {
        group: String,
        /// Genre to narrow by; repeat to match any of several
        #[arg(long = "genre")]
        genres: Vec<String>,
    },
    /// Show one channel by id
    Meta { id: String },
    /// Show the playable streams of one channel
    Streams { id: String },
    /// Show the catalog manifest
    Manifest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = match args.config.as_deref() {
        Some(path) => load_config_from(Some(path))?,
        None => load_config()?,
    };

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("LiveTV engine starting...");

    // 3. Initialize engine
    let engine = init_engine(&config)?;

    match args.command {
        Command::Run => run(engine).await,
        Command::Catalog { group, genres } => {
            let filter = match genres.len() {
                0 => None,
                1 => Some(GenreFilter::One(genres[0].clone())),
                _ => Some(GenreFilter::Many(genres)),
            };
            print_json(&engine.query.list_catalog(&group, filter.as_ref()).await)
        }
        Command::Meta { id } => print_json(&engine.query.get_meta(&id).await),
        Command::Streams { id } => print_json(&engine.query.get_streams(&id).await),
        Command::Manifest => print_json(&engine.query.manifest().await),
    }
}

async fn run(engine: Engine) -> Result<()> {
    let shutdown = CancellationToken::new();
    let tasks = engine.start(shutdown.clone());

    shutdown_signal().await;
    info!("Shutting down...");

    shutdown.cancel();
    tasks.join().await;

    let stats = engine.cache.stats();
    info!(
        snapshots = stats.snapshots,
        verifications = stats.verifications,
        "LiveTV engine stopped"
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
