// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::types::{AgentStateEntry, JobToRun, TaskStateEntry};
use mg_core::{GridTask, ProcessStateReport};
use serde::{Deserialize, Serialize};

/// Whether a submission created the job or hit an existing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddJobOutcome {
    Added,
    IsDuplicate,
}

mg_core::display_names! {
    AddJobOutcome {
        Added => "added",
        IsDuplicate => "is_duplicate",
    }
}

/// Standard health-check answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Serving,
    NotServing,
}

mg_core::display_names! {
    HealthStatus {
        Serving => "serving",
        NotServing => "not_serving",
    }
}

/// Response from the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Pong,
    Hello { version: String },
    ShuttingDown,

    /// Answer to `AddJob` and `AddTasksToGridJob`.
    JobAdded { outcome: AddJobOutcome },

    /// Positional answer to `GetSimpleJobStates`.
    JobStates { states: Vec<ProcessStateReport> },

    /// Answer to `GetGridTaskStates`.
    TaskStates { states: Vec<TaskStateEntry> },

    /// Answer to `GetAgentStates`.
    AgentStates { agents: Vec<AgentStateEntry> },

    /// Answer to `GetNextJobs`.
    JobsToRun { jobs: Vec<JobToRun> },

    /// Answer to `UpdateGridTaskStateAndGetNext`. `task` is empty when
    /// nothing is queued right now; `closed` tells the worker the queue
    /// will never produce another task, so it should exit.
    NextTask {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<GridTask>,
        #[serde(default)]
        closed: bool,
    },

    /// Answer to `Check`.
    Health { status: HealthStatus },

    /// Request failed; nothing was changed.
    Error { message: String },
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
