// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario tests.

use mg_coordinator::adapters::{CommandDeploymentResolver, HostCredentialFetcher};
use mg_coordinator::{start, CoordinatorConfig, CoordinatorHandle};
use mg_core::{ProcessState, Resources, SystemClock};
use mg_proto::CoordinatorClient;
use std::sync::Arc;
use std::time::Duration;

/// Coordinator on an ephemeral port with a fast sweep, so scenario tests
/// observe scheduling decisions quickly.
pub async fn start_coordinator() -> (CoordinatorHandle, CoordinatorClient) {
    start_coordinator_with_heartbeat(Duration::from_secs(30)).await
}

pub async fn start_coordinator_with_heartbeat(
    heartbeat_timeout: Duration,
) -> (CoordinatorHandle, CoordinatorClient) {
    let config = CoordinatorConfig {
        bind: "127.0.0.1:0".to_string(),
        heartbeat_timeout,
        sweep_interval: Duration::from_millis(50),
    };
    let handle = start(
        config,
        SystemClock,
        Arc::new(CommandDeploymentResolver),
        Arc::new(HostCredentialFetcher::new(None)),
    )
    .await
    .expect("coordinator failed to bind");
    let client = CoordinatorClient::new(handle.local_addr().to_string());
    (handle, client)
}

pub fn res(pairs: &[(&str, f64)]) -> Resources {
    pairs.iter().map(|(n, v)| (*n, *v)).collect()
}

/// Poll a job until it reaches a terminal state, with a hard deadline.
pub async fn wait_for_terminal(
    client: &CoordinatorClient,
    job_id: &str,
    deadline: Duration,
) -> mg_core::ProcessStateReport {
    let started = std::time::Instant::now();
    loop {
        let states = client
            .get_simple_job_states(vec![job_id.into()])
            .await
            .expect("state query failed");
        let report = states.into_iter().next().expect("missing state");
        if report.state.is_terminal() {
            return report;
        }
        assert!(
            started.elapsed() < deadline,
            "job {} still {} after {:?}",
            job_id,
            report.state,
            deadline
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Poll until the job reads a specific state.
pub async fn wait_for_state(
    client: &CoordinatorClient,
    job_id: &str,
    expect: ProcessState,
    deadline: Duration,
) {
    let started = std::time::Instant::now();
    loop {
        let states = client
            .get_simple_job_states(vec![job_id.into()])
            .await
            .expect("state query failed");
        let report = states.into_iter().next().expect("missing state");
        if report.state == expect {
            return;
        }
        assert!(
            started.elapsed() < deadline,
            "job {} is {} (wanted {}) after {:?}",
            job_id,
            report.state,
            expect,
            deadline
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
