// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mg_core::{
    AgentId, CredentialReference, CredentialService, GridTask, GridWorkerId, Job, JobId,
    ProcessStateReport, Resources, TaskId,
};
use serde::{Deserialize, Serialize};

/// One job (or grid worker) state transition reported by an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStateUpdate {
    pub job_id: JobId,
    /// Present when the update concerns a grid worker rather than the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_worker_id: Option<GridWorkerId>,
    pub report: ProcessStateReport,
}

/// Outcome of the task a grid worker just finished, reported together with
/// its request for the next one. Absent on the worker's first call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStateUpdate {
    pub task_id: TaskId,
    pub report: ProcessStateReport,
}

/// Request from a client or agent to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Submit a job. Duplicate ids are reported, not overwritten.
    AddJob { job: Job },

    /// Append tasks to a grid job; `all_tasks_added` closes the queue.
    AddTasksToGridJob {
        job_id: JobId,
        tasks: Vec<GridTask>,
        #[serde(default)]
        all_tasks_added: bool,
    },

    /// Per-id job states; unknown ids come back as `unknown`.
    GetSimpleJobStates { job_ids: Vec<JobId> },

    /// Per-task states of a grid job, skipping ids the client already has.
    GetGridTaskStates {
        job_id: JobId,
        #[serde(default)]
        ignore: Vec<TaskId>,
    },

    /// Register a credential source for a (service, URL prefix) pair.
    AddCredentials {
        service: CredentialService,
        service_url: String,
        reference: CredentialReference,
    },

    /// Snapshot of every agent's total and available resources.
    GetAgentStates,

    /// Agent announces itself and its capacity. Idempotent on identical
    /// totals; changed totals mean the agent restarted.
    RegisterAgent {
        agent_id: AgentId,
        resources: Resources,
        /// Affinity: a job-specific agent serves only this job.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<JobId>,
    },

    /// Agent polls for newly assigned work.
    GetNextJobs {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<JobId>,
    },

    /// Agent reports state transitions for jobs or grid workers it owns.
    UpdateJobStates {
        agent_id: AgentId,
        updates: Vec<JobStateUpdate>,
    },

    /// Grid worker finishes one task (if any) and asks for the next.
    UpdateGridTaskStateAndGetNext {
        job_id: JobId,
        grid_worker_id: GridWorkerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed: Option<TaskStateUpdate>,
    },

    /// Standard health check.
    Check {
        #[serde(default)]
        service: String,
    },

    /// Request coordinator shutdown
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
