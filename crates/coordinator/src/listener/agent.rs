// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-facing request handlers: registration, polling, state reporting,
//! and the grid-task pull loop.

use super::ListenCtx;
use crate::scheduler;
use crate::state::ReservationKey;
use mg_core::{
    AgentId, Clock, CodeDeployment, CredentialReference, CredentialService, Credentials,
    GridWorkerId, InterpreterDeployment, Job, JobId, Resources,
};
use mg_proto::{JobStateUpdate, JobToRun, Response, TaskStateUpdate};
use tracing::{debug, info, warn};

pub(super) fn handle_register_agent<C: Clock>(
    ctx: &ListenCtx<C>,
    agent_id: AgentId,
    resources: Resources,
    job_id: Option<JobId>,
) -> Response {
    if let Err(e) = resources.validate() {
        return Response::Error { message: e.to_string() };
    }
    let now_ms = ctx.clock.epoch_ms();
    {
        let mut state = ctx.state.lock();
        let registration = state.register_agent(&agent_id, resources, job_id, now_ms);
        info!(agent_id = %agent_id, ?registration, "agent registered");
        scheduler::apply_registration(&mut state, &registration);
    }
    ctx.wake.notify_one();
    Response::Ok
}

pub(super) async fn handle_get_next_jobs<C: Clock>(
    ctx: &ListenCtx<C>,
    agent_id: AgentId,
) -> Response {
    let now_ms = ctx.clock.epoch_ms();

    type CredRefs = (Option<CredentialReference>, Option<CredentialReference>);
    let (assignments, references): (Vec<scheduler::Assignment>, Vec<CredRefs>) = {
        let mut state = ctx.state.lock();
        if !state.agents.contains_key(&agent_id) {
            return Response::Error {
                message: format!("unknown agent '{}': register first", agent_id),
            };
        }
        state.touch_agent(&agent_id, now_ms);
        let mut rng = ctx.rng.lock();
        let assignments = scheduler::next_jobs_for_agent(&mut state, &mut rng, &agent_id);
        let references = assignments
            .iter()
            .map(|assignment| credential_references(&state, &assignment.job))
            .collect();
        (assignments, references)
    };

    // Secret fetches do I/O; they happen after the state lock is gone.
    let mut jobs = Vec::with_capacity(assignments.len());
    for (assignment, (code_ref, interpreter_ref)) in assignments.into_iter().zip(references) {
        let code_credentials = fetch_credentials(ctx, code_ref).await;
        let interpreter_credentials = fetch_credentials(ctx, interpreter_ref).await;
        jobs.push(JobToRun {
            job: assignment.job,
            grid_worker_id: assignment.grid_worker_id,
            code_credentials,
            interpreter_credentials,
        });
    }
    Response::JobsToRun { jobs }
}

fn credential_references(
    state: &crate::state::GridState,
    job: &Job,
) -> (Option<CredentialReference>, Option<CredentialReference>) {
    let code = match &job.code_deployment {
        CodeDeployment::GitRepoCommit { url, .. } | CodeDeployment::GitRepoBranch { url, .. } => {
            state.credentials.lookup(CredentialService::Git, url).cloned()
        }
        CodeDeployment::ServerAvailableFolder { .. } => None,
    };
    let interpreter = match &job.interpreter_deployment {
        InterpreterDeployment::ContainerAtDigest { repository, .. }
        | InterpreterDeployment::ContainerAtTag { repository, .. } => {
            state.credentials.lookup(CredentialService::Docker, repository).cloned()
        }
        InterpreterDeployment::ServerAvailableInterpreter { .. }
        | InterpreterDeployment::ServerAvailableContainer { .. } => None,
    };
    (code, interpreter)
}

async fn fetch_credentials<C: Clock>(
    ctx: &ListenCtx<C>,
    reference: Option<CredentialReference>,
) -> Option<Credentials> {
    let reference = reference?;
    match ctx.fetcher.fetch(&reference).await {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            // The agent still gets the job; the deployment will fail there
            // if the credentials were actually required.
            warn!(error = %e, "credential resolution failed");
            None
        }
    }
}

pub(super) fn handle_update_job_states<C: Clock>(
    ctx: &ListenCtx<C>,
    agent_id: AgentId,
    updates: Vec<JobStateUpdate>,
) -> Response {
    let now_ms = ctx.clock.epoch_ms();
    let mut released = false;
    {
        let mut state = ctx.state.lock();
        state.touch_agent(&agent_id, now_ms);
        for update in updates {
            let terminal = update.report.state.is_terminal();
            let failure = update.report.state.is_failure();
            match update.grid_worker_id {
                // Grid worker lifecycle report.
                Some(worker_id) => {
                    if let Some(queue) = state
                        .jobs
                        .get_mut(&update.job_id)
                        .and_then(|record| record.tasks.as_mut())
                    {
                        if let Some(worker) = queue.workers.get_mut(&worker_id) {
                            worker.report = update.report;
                        } else {
                            debug!(job_id = %update.job_id, worker_id = %worker_id,
                                "report for unknown worker");
                        }
                    }
                    if terminal {
                        // A worker that died mid-task takes the task down
                        // with it; a clean exit has none in flight.
                        state.remove_worker(&update.job_id, &worker_id, failure);
                        state.release(
                            &agent_id,
                            &ReservationKey::worker(update.job_id.clone(), worker_id),
                        );
                        released = true;
                    }
                }
                // Plain job report.
                None => {
                    state.update_job_state(&update.job_id, update.report);
                    if terminal {
                        state.release(&agent_id, &ReservationKey::job(update.job_id.clone()));
                        released = true;
                    }
                }
            }
        }
    }
    if released {
        ctx.wake.notify_one();
    }
    Response::Ok
}

pub(super) fn handle_update_grid_task<C: Clock>(
    ctx: &ListenCtx<C>,
    job_id: JobId,
    worker_id: GridWorkerId,
    completed: Option<TaskStateUpdate>,
) -> Response {
    let now_ms = ctx.clock.epoch_ms();
    let mut state = ctx.state.lock();

    let agent_id = state
        .jobs
        .get(&job_id)
        .and_then(|record| record.tasks.as_ref())
        .and_then(|queue| queue.workers.get(&worker_id))
        .map(|worker| worker.agent_id.clone());
    let Some(agent_id) = agent_id else {
        // The worker was removed underneath us (agent lost or reset); the
        // closed marker makes the stray worker exit.
        debug!(job_id = %job_id, worker_id = %worker_id, "poll from unknown worker");
        return Response::NextTask { task: None, closed: true };
    };
    state.touch_agent(&agent_id, now_ms);

    if let Some(completed) = completed {
        if let Err(e) = state.update_task(&job_id, completed.task_id, completed.report) {
            return Response::Error { message: e.to_string() };
        }
    }

    match state.dequeue_task(&job_id, &worker_id) {
        Ok(Some(task)) => Response::NextTask { task: Some(task), closed: false },
        Ok(None) => {
            let closed = state
                .jobs
                .get(&job_id)
                .and_then(|record| record.tasks.as_ref())
                .map(|queue| queue.is_closed())
                .unwrap_or(true);
            if closed {
                // Queue drained for good: the worker exits and its
                // reservation goes back to the pool.
                state.remove_worker(&job_id, &worker_id, false);
                state.release(&agent_id, &ReservationKey::worker(job_id.clone(), worker_id));
                drop(state);
                ctx.wake.notify_one();
                Response::NextTask { task: None, closed: true }
            } else {
                Response::NextTask { task: None, closed: false }
            }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}
