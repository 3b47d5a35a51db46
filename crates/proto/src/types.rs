// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol DTOs shared between requests and responses.

use mg_core::{AgentId, Credentials, GridWorkerId, Job, ProcessStateReport, Resources, TaskId};
use serde::{Deserialize, Serialize};

/// An assignment delivered to an agent on poll: the job itself, the minted
/// worker id for grid jobs, and any credentials its deployments need.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobToRun {
    pub job: Job,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_worker_id: Option<GridWorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter_credentials: Option<Credentials>,
}

/// One task's state as returned by `GetGridTaskStates`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStateEntry {
    pub task_id: TaskId,
    pub report: ProcessStateReport,
}

/// One agent's capacity as returned by `GetAgentStates`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentStateEntry {
    pub agent_id: AgentId,
    pub total: Resources,
    pub available: Resources,
}
