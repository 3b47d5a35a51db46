// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! meadowgrid coordinator library.
//!
//! [`start`] binds the listener, spawns the background scheduler sweep,
//! and returns a handle; the binary and the scenario tests share it.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod env;
mod listener;
pub mod scheduler;
pub mod state;

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::{
    CommandDeploymentResolver, CredentialFetcher, DeploymentResolver, HostCredentialFetcher,
};
use crate::listener::{ListenCtx, Listener};
use crate::state::GridState;
use mg_core::{Clock, SystemClock};

/// Coordinator settings; defaults come from the environment.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub bind: String,
    pub heartbeat_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind: env::DEFAULT_BIND.to_string(),
            heartbeat_timeout: env::heartbeat_timeout(),
            sweep_interval: env::sweep_interval(),
        }
    }
}

/// A running coordinator: its bound address and the knobs to stop it.
pub struct CoordinatorHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    shutdown: Arc<Notify>,
}

impl CoordinatorHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolves when a client asked the coordinator to shut down.
    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }

    /// Stop the listener and the background sweep.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Bind and start serving with explicit collaborators (tests swap in fakes
/// and a controllable clock).
pub async fn start<C: Clock>(
    config: CoordinatorConfig,
    clock: C,
    resolver: Arc<dyn DeploymentResolver>,
    fetcher: Arc<dyn CredentialFetcher>,
) -> std::io::Result<CoordinatorHandle> {
    let tcp = TcpListener::bind(&config.bind).await?;
    let local_addr = tcp.local_addr()?;
    info!(%local_addr, "coordinator listening");

    let wake = Arc::new(Notify::new());
    let shutdown = Arc::new(Notify::new());
    let ctx = Arc::new(ListenCtx {
        state: Arc::new(Mutex::new(GridState::new())),
        rng: Mutex::new(StdRng::from_entropy()),
        resolver,
        fetcher,
        clock,
        wake,
        shutdown: Arc::clone(&shutdown),
        shutting_down: AtomicBool::new(false),
    });

    let cancel = CancellationToken::new();
    tokio::spawn(Listener::new(tcp, Arc::clone(&ctx)).run(cancel.clone()));
    tokio::spawn(sweep_loop(ctx, cancel.clone(), config.heartbeat_timeout, config.sweep_interval));

    Ok(CoordinatorHandle { local_addr, cancel, shutdown })
}

/// Bind and start serving with the production collaborators.
pub async fn start_default(config: CoordinatorConfig) -> std::io::Result<CoordinatorHandle> {
    start(
        config,
        SystemClock,
        Arc::new(CommandDeploymentResolver),
        Arc::new(HostCredentialFetcher::from_env()),
    )
    .await
}

/// Background scheduler sweep: infeasible jobs and lost agents.
///
/// Awakened by submissions, registrations, and resource releases; the
/// interval tick bounds how stale a liveness verdict can be.
async fn sweep_loop<C: Clock>(
    ctx: Arc<ListenCtx<C>>,
    cancel: CancellationToken,
    heartbeat_timeout: Duration,
    sweep_interval: Duration,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ctx.wake.notified() => {}
            _ = tokio::time::sleep(sweep_interval) => {}
        }
        let now_ms = ctx.clock.epoch_ms();
        let mut state = ctx.state.lock();
        scheduler::mark_infeasible(&mut state);
        scheduler::expire_agents(&mut state, now_ms, heartbeat_timeout.as_millis() as u64);
    }
}
