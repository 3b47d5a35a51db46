// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the coordinator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default coordinator bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:15319";

/// No usable state directory could be resolved.
#[derive(Debug, Error)]
#[error("no state directory: set MG_STATE_DIR (or HOME for the default location)")]
pub struct NoStateDir;

/// Resolve the state directory (log files live here):
/// `MG_STATE_DIR` > `XDG_STATE_HOME/meadowgrid` > `~/.local/state/meadowgrid`
pub fn state_dir() -> Result<PathBuf, NoStateDir> {
    if let Ok(dir) = std::env::var("MG_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("meadowgrid"));
    }
    let home = std::env::var("HOME").map_err(|_| NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/meadowgrid"))
}

/// Default RPC timeout
pub fn ipc_timeout() -> Duration {
    millis_env("MG_IPC_TIMEOUT_MS", Duration::from_secs(5))
}

/// How long an agent may stay silent before it is declared lost.
pub fn heartbeat_timeout() -> Duration {
    millis_env("MG_HEARTBEAT_TIMEOUT_MS", Duration::from_secs(30))
}

/// Cadence of the background scheduler sweep.
pub fn sweep_interval() -> Duration {
    millis_env("MG_SWEEP_INTERVAL_MS", Duration::from_secs(1))
}

/// Command template for secret-manager lookups; `{name}` is replaced with
/// the secret name and the result run through `sh -c`.
pub fn secret_fetch_cmd() -> Option<String> {
    std::env::var("MG_SECRET_FETCH_CMD").ok().filter(|s| !s.is_empty())
}

fn millis_env(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
