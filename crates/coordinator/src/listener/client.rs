// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing request handlers: submission and state queries.

use super::ListenCtx;
use crate::adapters::resolve_job_deployments;
use mg_core::{Clock, CredentialReference, CredentialService, GridTask, Job, JobId, TaskId};
use mg_proto::{AddJobOutcome, Response};
use tracing::info;

/// Admit a job: validate, duplicate-check, pin moving deployment
/// references, insert, and wake the scheduler.
pub(super) async fn handle_add_job<C: Clock>(ctx: &ListenCtx<C>, job: Job) -> Response {
    // Cheap rejections first, without touching the resolver.
    if let Err(e) = job.validate() {
        return Response::Error { message: e.to_string() };
    }
    if ctx.state.lock().jobs.contains_key(&job.id) {
        return Response::JobAdded { outcome: AddJobOutcome::IsDuplicate };
    }

    // Branch/tag pinning does network I/O, so it happens outside the
    // state lock. A racing duplicate is caught again on insert.
    let job = match resolve_job_deployments(ctx.resolver.as_ref(), job).await {
        Ok(job) => job,
        Err(e) => return Response::Error { message: e.to_string() },
    };

    let now_ms = ctx.clock.epoch_ms();
    let outcome = ctx.state.lock().add_job(job, now_ms);
    match outcome {
        Ok(outcome) => {
            if outcome == AddJobOutcome::Added {
                ctx.wake.notify_one();
            }
            Response::JobAdded { outcome }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}

pub(super) fn handle_add_tasks<C: Clock>(
    ctx: &ListenCtx<C>,
    job_id: JobId,
    tasks: Vec<GridTask>,
    all_tasks_added: bool,
) -> Response {
    let count = tasks.len();
    let result = ctx.state.lock().append_tasks(&job_id, tasks, all_tasks_added);
    match result {
        Ok(()) => {
            info!(job_id = %job_id, count, closed = all_tasks_added, "tasks appended");
            ctx.wake.notify_one();
            Response::JobAdded { outcome: AddJobOutcome::Added }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}

pub(super) fn handle_get_simple_job_states<C: Clock>(
    ctx: &ListenCtx<C>,
    job_ids: &[JobId],
) -> Response {
    let state = ctx.state.lock();
    let states = job_ids.iter().map(|id| state.simple_job_state(id)).collect();
    Response::JobStates { states }
}

pub(super) fn handle_get_grid_task_states<C: Clock>(
    ctx: &ListenCtx<C>,
    job_id: &JobId,
    ignore: &[TaskId],
) -> Response {
    match ctx.state.lock().task_states(job_id, ignore) {
        Ok(states) => Response::TaskStates { states },
        Err(e) => Response::Error { message: e.to_string() },
    }
}

pub(super) fn handle_add_credentials<C: Clock>(
    ctx: &ListenCtx<C>,
    service: CredentialService,
    service_url: String,
    reference: CredentialReference,
) -> Response {
    info!(%service, url = %service_url, "credential source registered");
    ctx.state.lock().credentials.add(service, service_url, reference);
    Response::Ok
}

pub(super) fn handle_get_agent_states<C: Clock>(ctx: &ListenCtx<C>) -> Response {
    Response::AgentStates { agents: ctx.state.lock().agent_snapshot() }
}
