//! Fieldflow service binary.
//!
//! Usage:
//!     fieldflow --watch-dir ./uploads --database ./fieldflow.sqlite3

use anyhow::Result;
use clap::Parser;
use fieldflow::{FieldflowConfig, Pipeline};
use fieldflow_db::FieldflowDb;
use fieldflow_logging::LogConfig;
use fieldflow_watcher::{DirWatcher, WatcherConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "fieldflow", about = "Bronze-stage ingestion and validation for field data files")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to watch for incoming files
    #[arg(long)]
    watch_dir: Option<PathBuf>,

    /// SQLite database path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory validation reports are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Verbose console logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    fieldflow_logging::init_logging(LogConfig {
        app_name: "fieldflow",
        verbose: args.verbose,
    })?;

    let mut config = match &args.config {
        Some(path) => FieldflowConfig::load(path)?,
        None => FieldflowConfig::default(),
    };
    if let Some(watch_dir) = args.watch_dir {
        config.watch_dir = watch_dir;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }

    info!("Starting Fieldflow");
    info!("  Watch dir: {}", config.watch_dir.display());
    info!("  Database:  {}", config.database_path.display());
    info!("  Output:    {}", config.output_dir.display());

    let db = FieldflowDb::open(&config.database_path).await?;

    // Background watcher: registers newly dropped files, best-effort. A
    // failed registration is logged and retried only if the file reappears
    // as unseen (i.e. after a restart).
    let watcher = DirWatcher::new(WatcherConfig {
        dir: config.watch_dir.clone(),
        extension: config.extension.clone(),
        interval: Duration::from_secs(config.watch_interval_secs),
    });
    let register_db = db.clone();
    let datatype = config.datatype.clone();
    tokio::spawn(watcher.run(move |path| {
        let db = register_db.clone();
        let datatype = datatype.clone();
        async move {
            match db.register_file(&path, &datatype, "").await {
                Ok(file_id) => info!(file_id, path = %path.display(), "Registration complete"),
                Err(e) => error!(path = %path.display(), error = %e, "Registration failed"),
            }
        }
    }));

    // Foreground poller: one file per tick, errors logged and swallowed so
    // the loop runs until interrupted.
    let pipeline = Pipeline::new(db, config.build_registry(), config.output_dir.clone())?;
    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));

    info!("Starting table polling");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = pipeline.process_next().await {
                    error!(error = %e, "Processing pass failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Polling stopped by user");
                break;
            }
        }
    }

    Ok(())
}
