// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! meadowgrid coordinator binary.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mg_coordinator::{env, start_default, CoordinatorConfig};

/// Accepts job submissions, tracks job and task state, and assigns work to
/// agents.
#[derive(Parser)]
#[command(name = "mg-coordinator", version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "MG_COORDINATOR_BIND", default_value = env::DEFAULT_BIND)]
    bind: String,

    /// Directory for coordinator log files
    /// (default: MG_STATE_DIR, then the XDG state location)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Append logs to this file instead of <state-dir>/coordinator.log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    if let Some(dir) = log_file.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let name = log_file.file_name().unwrap_or_else(|| std::ffi::OsStr::new("coordinator.log"));
    let filter = EnvFilter::try_from_env("MG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Log file: explicit flag wins, otherwise coordinator.log under the
    // state directory (flag, env, or XDG fallback).
    let log_file = match args.log_file {
        Some(path) => path,
        None => {
            let state_dir = match args.state_dir.map(Ok).unwrap_or_else(env::state_dir) {
                Ok(dir) => dir,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            state_dir.join("coordinator.log")
        }
    };
    let _guard = match init_tracing(&log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: cannot open log file {}: {}", log_file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let config = CoordinatorConfig { bind: args.bind, ..CoordinatorConfig::default() };
    let handle = match start_default(config).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("failed to start coordinator: {}", e);
            eprintln!("error: failed to start coordinator: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(log_file = %log_file.display(), "coordinator started");

    tokio::select! {
        _ = handle.shutdown_requested() => info!("shutdown requested by client"),
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("interrupted, shutting down"),
            Err(e) => error!("signal handler failed: {}", e),
        },
    }
    handle.stop();
    ExitCode::SUCCESS
}
