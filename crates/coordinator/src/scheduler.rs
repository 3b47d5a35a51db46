// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling decisions.
//!
//! Assignment happens on agent poll: the candidate set for that agent is
//! built, one job is drawn with probability proportional to priority, its
//! resources are reserved, and the loop repeats until nothing else fits. A
//! job holding fraction p of the total pending priority therefore receives
//! fraction p of the dispatches over time.
//!
//! A background sweep handles what polls cannot: jobs no agent could ever
//! fit, and agents that stopped polling.

use crate::state::{GridState, GridWorker, Registration, ReservationKey};
use mg_core::{
    AgentId, GridWorkerId, Job, JobId, ProcessState, ProcessStateReport, Resources,
};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

/// One job handed to an agent on poll. Credentials are attached later,
/// outside the state lock.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub job: Job,
    pub grid_worker_id: Option<GridWorkerId>,
}

struct Candidate {
    job_id: JobId,
    seq: u64,
    priority: f64,
    required: Resources,
    grid: bool,
}

/// Assign as many pending jobs to `agent_id` as its free resources allow.
pub fn next_jobs_for_agent(
    state: &mut GridState,
    rng: &mut StdRng,
    agent_id: &AgentId,
) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    loop {
        let Some(agent) = state.agents.get(agent_id) else { break };
        let affinity = agent.job_affinity.clone();
        let available = agent.available.clone();

        let mut candidates: Vec<Candidate> = state
            .jobs
            .iter()
            .filter_map(|(job_id, record)| {
                if let Some(only) = affinity.as_ref() {
                    if only != job_id {
                        return None;
                    }
                }
                if record.report.state.is_terminal() {
                    return None;
                }
                match record.tasks.as_ref() {
                    // Grid demand: tasks are waiting and this agent has no
                    // worker on the job yet.
                    Some(queue) => {
                        if !queue.has_pending() || queue.has_worker_on(agent_id) {
                            return None;
                        }
                    }
                    // Non-grid jobs get exactly one agent.
                    None => {
                        if record.report.state != ProcessState::RunRequested
                            || record.assigned_agent.is_some()
                        {
                            return None;
                        }
                    }
                }
                if !available.dominates(&record.job.resources_required) {
                    return None;
                }
                Some(Candidate {
                    job_id: job_id.clone(),
                    seq: record.seq,
                    priority: record.job.priority,
                    required: record.job.resources_required.clone(),
                    grid: record.tasks.is_some(),
                })
            })
            .collect();
        if candidates.is_empty() {
            break;
        }
        // Walk in submission order while accumulating weight, so equal
        // priorities favor earlier submissions.
        candidates.sort_by_key(|c| c.seq);
        let total: f64 = candidates.iter().map(|c| c.priority).sum();
        let draw = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = candidates.len() - 1;
        for (idx, candidate) in candidates.iter().enumerate() {
            cumulative += candidate.priority;
            if draw < cumulative {
                chosen = idx;
                break;
            }
        }
        let candidate = candidates.swap_remove(chosen);

        let key = if candidate.grid {
            let worker_id = GridWorkerId::new(format!("gw-{}", nanoid::nanoid!(10)));
            ReservationKey::worker(candidate.job_id.clone(), worker_id)
        } else {
            ReservationKey::job(candidate.job_id.clone())
        };
        if !state.reserve(agent_id, key.clone(), &candidate.required) {
            // dominates() held above and we are under the state lock, so
            // this can only mean the agent vanished mid-loop.
            warn!(agent_id = %agent_id, job_id = %candidate.job_id, "reservation failed");
            break;
        }

        let Some(record) = state.jobs.get_mut(&candidate.job_id) else { break };
        match key.worker_id.clone() {
            Some(worker_id) => {
                if let Some(queue) = record.tasks.as_mut() {
                    queue.workers.insert(
                        worker_id.clone(),
                        GridWorker {
                            agent_id: agent_id.clone(),
                            current_task: None,
                            report: ProcessStateReport::new(ProcessState::RunRequested),
                        },
                    );
                }
                info!(job_id = %candidate.job_id, agent_id = %agent_id, worker_id = %worker_id, "grid worker assigned");
                assignments.push(Assignment {
                    job: record.job.clone(),
                    grid_worker_id: Some(worker_id),
                });
            }
            None => {
                record.assigned_agent = Some(agent_id.clone());
                info!(job_id = %candidate.job_id, agent_id = %agent_id, "job assigned");
                assignments.push(Assignment { job: record.job.clone(), grid_worker_id: None });
            }
        }
    }
    assignments
}

/// Terminal-fail every pending job whose requirement exceeds what any
/// eligible agent could ever offer. Only meaningful once agents exist.
pub fn mark_infeasible(state: &mut GridState) -> Vec<JobId> {
    if state.agents.is_empty() {
        return Vec::new();
    }
    let doomed: Vec<JobId> = state
        .jobs
        .iter()
        .filter(|(job_id, record)| {
            let waiting = match record.tasks.as_ref() {
                Some(queue) => queue.workers.is_empty(),
                None => {
                    record.report.state == ProcessState::RunRequested
                        && record.assigned_agent.is_none()
                }
            };
            if record.report.state.is_terminal() || !waiting {
                return false;
            }
            !state.agents.values().any(|agent| {
                let eligible = match agent.job_affinity.as_ref() {
                    Some(only) => only == *job_id,
                    None => true,
                };
                eligible && agent.total.dominates(&record.job.resources_required)
            })
        })
        .map(|(job_id, _)| job_id.clone())
        .collect();
    for job_id in &doomed {
        warn!(job_id = %job_id, "no agent can ever satisfy resource requirement");
        state.update_job_state(
            job_id,
            ProcessStateReport::new(ProcessState::ResourcesNotAvailable),
        );
    }
    doomed
}

/// Remove agents that stopped polling, failing their in-flight work.
pub fn expire_agents(state: &mut GridState, now_ms: u64, timeout_ms: u64) -> Vec<AgentId> {
    let expired: Vec<AgentId> = state
        .agents
        .iter()
        .filter(|(_, record)| now_ms.saturating_sub(record.last_seen_ms) > timeout_ms)
        .map(|(agent_id, _)| agent_id.clone())
        .collect();
    for agent_id in &expired {
        warn!(agent_id = %agent_id, "agent heartbeat timed out, declaring lost");
        if let Some(record) = state.agents.remove(agent_id) {
            let orphaned: Vec<ReservationKey> = record.reservations.into_keys().collect();
            fail_orphaned_work(state, &orphaned);
        }
    }
    expired
}

/// After an agent is lost or resets, everything it had reserved moves to
/// `error_getting_state` (tasks keep their blame on the worker that held
/// them; nothing is retried).
pub fn fail_orphaned_work(state: &mut GridState, orphaned: &[ReservationKey]) {
    for key in orphaned {
        match key.worker_id.as_ref() {
            Some(worker_id) => {
                state.remove_worker(&key.job_id, worker_id, true);
            }
            None => {
                state.update_job_state(
                    &key.job_id,
                    ProcessStateReport::new(ProcessState::ErrorGettingState),
                );
            }
        }
    }
}

/// Handle the fallout of a registration result (agent restarts orphan
/// whatever the previous incarnation was running).
pub fn apply_registration(state: &mut GridState, registration: &Registration) {
    if let Registration::Reset { orphaned } = registration {
        debug!(count = orphaned.len(), "failing work orphaned by re-registration");
        fail_orphaned_work(state, orphaned);
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
