// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The listener runs in a spawned task, accepting TCP connections and
//! handling each on its own task so a slow client never blocks the rest.
//! One framed request/response exchange per connection.

mod agent;
mod client;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::{CredentialFetcher, DeploymentResolver};
use crate::env::ipc_timeout;
use crate::state::GridState;
use mg_core::Clock;
use mg_proto::{
    read_request, write_response, HealthStatus, ProtocolError, Request, Response,
    PROTOCOL_VERSION,
};

/// Shared coordinator context for all request handlers.
pub(crate) struct ListenCtx<C: Clock> {
    pub state: Arc<Mutex<GridState>>,
    /// Scheduler randomness; seeded from entropy in production.
    pub rng: Mutex<StdRng>,
    pub resolver: Arc<dyn DeploymentResolver>,
    pub fetcher: Arc<dyn CredentialFetcher>,
    pub clock: C,
    /// Wakes the background scheduler sweep.
    pub wake: Arc<Notify>,
    /// Raised by a Shutdown request; the binary exits on it.
    pub shutdown: Arc<Notify>,
    pub shutting_down: AtomicBool,
}

/// Listener task accepting coordinator connections.
pub(crate) struct Listener<C: Clock> {
    tcp: TcpListener,
    ctx: Arc<ListenCtx<C>>,
}

impl<C: Clock> Listener<C> {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx<C>>) -> Self {
        Self { tcp, ctx }
    }

    /// Accept connections until cancelled, spawning a task per connection.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("listener stopping");
                    break;
                }
                result = self.tcp.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("connection from {}", addr);
                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(async move {
                                let (reader, writer) = stream.into_split();
                                if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                    log_connection_error(e);
                                }
                            });
                        }
                        Err(e) => error!("accept error: {}", e),
                    }
                }
            }
        }
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => warn!("connection timeout"),
        _ => error!("connection error: {}", e),
    }
}

/// Handle a single connection: read one request, dispatch, write the
/// response. The handler races against client disconnect so orphaned
/// handlers do not keep working for a caller that gave up.
async fn handle_connection<R, W, C>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<C>,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + AsyncReadExt + Unpin + Send + 'static,
    W: AsyncWrite + AsyncWriteExt + Unpin + Send + 'static,
    C: Clock,
{
    let request = read_request(&mut reader, ipc_timeout()).await?;

    // Agent polls arrive once per poll interval per agent; keep them at
    // debug so an idle fleet does not fill the log.
    match &request {
        Request::GetNextJobs { .. }
        | Request::GetSimpleJobStates { .. }
        | Request::GetGridTaskStates { .. }
        | Request::Ping => debug!(request = ?request, "received query"),
        _ => info!(request = ?request, "received request"),
    }

    let response = tokio::select! {
        response = handle_request(request, ctx) => response,
        _ = detect_client_disconnect(&mut reader) => {
            debug!("client disconnected, dropping handler");
            return Ok(());
        }
    };

    write_response(&mut writer, &response, ipc_timeout()).await
}

/// In the one-exchange protocol the client sends nothing after its
/// request; a read returning means EOF, i.e. the client went away.
async fn detect_client_disconnect<R: AsyncReadExt + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

/// Dispatch a request to its handler.
async fn handle_request<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => {
            Response::Hello { version: PROTOCOL_VERSION.to_string() }
        }

        Request::Check { service: _ } => {
            let status = if ctx.shutting_down.load(Ordering::SeqCst) {
                HealthStatus::NotServing
            } else {
                HealthStatus::Serving
            };
            Response::Health { status }
        }

        Request::Shutdown => {
            ctx.shutting_down.store(true, Ordering::SeqCst);
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }

        // Client-facing
        Request::AddJob { job } => client::handle_add_job(ctx, job).await,

        Request::AddTasksToGridJob { job_id, tasks, all_tasks_added } => {
            client::handle_add_tasks(ctx, job_id, tasks, all_tasks_added)
        }

        Request::GetSimpleJobStates { job_ids } => {
            client::handle_get_simple_job_states(ctx, &job_ids)
        }

        Request::GetGridTaskStates { job_id, ignore } => {
            client::handle_get_grid_task_states(ctx, &job_id, &ignore)
        }

        Request::AddCredentials { service, service_url, reference } => {
            client::handle_add_credentials(ctx, service, service_url, reference)
        }

        Request::GetAgentStates => client::handle_get_agent_states(ctx),

        // Agent-facing
        Request::RegisterAgent { agent_id, resources, job_id } => {
            agent::handle_register_agent(ctx, agent_id, resources, job_id)
        }

        Request::GetNextJobs { agent_id, job_id: _ } => {
            agent::handle_get_next_jobs(ctx, agent_id).await
        }

        Request::UpdateJobStates { agent_id, updates } => {
            agent::handle_update_job_states(ctx, agent_id, updates)
        }

        Request::UpdateGridTaskStateAndGetNext { job_id, grid_worker_id, completed } => {
            agent::handle_update_grid_task(ctx, job_id, grid_worker_id, completed)
        }
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
