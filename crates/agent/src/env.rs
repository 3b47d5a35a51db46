// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent.

use std::time::Duration;

/// How often the agent polls the coordinator for work.
pub fn poll_interval() -> Duration {
    std::env::var("MG_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(1))
}

/// Upper bound on a single git clone or container pull.
pub fn deploy_timeout() -> Duration {
    std::env::var("MG_DEPLOY_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(600))
}
