// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stow storage daemon (stowd)
//!
//! Owns the storage manager, runs scheduled maintenance and logs every
//! storage event until SIGTERM or SIGINT.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::{DaemonConfig, LifecycleError};

#[derive(Parser, Debug)]
#[command(name = "stowd", version, about = "Stow storage daemon")]
struct Args {
    /// Storage config file (TOML); defaults to the user config dir
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file; defaults to the user state dir
    #[arg(long)]
    log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = DaemonConfig::resolve(args.config.as_deref(), args.log.as_deref())
        .context("failed to resolve daemon configuration")?;

    let _log_guard = setup_logging(&config)?;
    info!(
        pid = std::process::id(),
        config = ?config.config_path,
        "starting stowd"
    );

    let daemon = match lifecycle::startup(&config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!("failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Signal ready for a supervising process
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    if let Err(e) = daemon.shutdown().await {
        error!("shutdown finished with error: {}", e);
        return Err(e.into());
    }
    info!("daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &DaemonConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = config
        .log_path
        .parent()
        .ok_or(LifecycleError::NoDir("log"))?;
    std::fs::create_dir_all(dir)?;
    let file_name = config
        .log_path
        .file_name()
        .ok_or(LifecycleError::NoDir("log"))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
