// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Vigil daemon (vigild)
//!
//! Runs health-check agents on adaptive schedules until signalled.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use vg_daemon::{lifecycle, VigilConfig};

#[derive(Parser)]
#[command(name = "vigild", version, about = "Adaptive health-check scheduler")]
struct Args {
    /// Config file (defaults to ./vigil.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run startup checks and one forced pass, print the status as JSON, exit
    #[arg(long)]
    once: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long, conflicts_with = "once")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = VigilConfig::discover(args.config.as_deref())?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let _log_guard = setup_logging(&config)?;
    info!(project_root = %config.daemon.project_root.display(), "starting vigild");

    let mut daemon = match lifecycle::startup(config).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    if args.once {
        let report = daemon.run_once().await;
        daemon.shutdown().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    daemon.start_monitoring();
    info!("daemon ready");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
    daemon.shutdown().await;

    info!("daemon stopped");
    Ok(())
}

fn setup_logging(config: &VigilConfig) -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (writer, guard) = match &config.daemon.log_path {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .with_context(|| format!("log path {} has no file name", path.display()))?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let ansi = config.daemon.log_path.is_none();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(ansi))
        .init();

    Ok(guard)
}
