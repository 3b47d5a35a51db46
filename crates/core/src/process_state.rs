// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process state machine shared by jobs and grid tasks.

use crate::blob::Blob;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job or grid task.
///
/// `Cancelled` is reserved: it is in the terminal set but nothing in the
/// system currently produces it. `Unknown` is what state queries return for
/// ids the coordinator has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Admitted, waiting for an agent.
    RunRequested,
    /// An agent is executing it.
    Running,
    Succeeded,
    /// The agent could not launch the process or container.
    RunRequestFailed,
    /// The process raised an uncaught exception in its runtime.
    PythonException,
    NonZeroReturnCode,
    /// No agent exists whose totals could ever satisfy the requirement.
    ResourcesNotAvailable,
    /// The agent (or its worker) was lost with the work in flight.
    ErrorGettingState,
    Cancelled,
    Unknown,
}

impl ProcessState {
    /// Terminal states are write-once: nothing transitions out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::Succeeded
                | ProcessState::RunRequestFailed
                | ProcessState::PythonException
                | ProcessState::NonZeroReturnCode
                | ProcessState::ResourcesNotAvailable
                | ProcessState::ErrorGettingState
                | ProcessState::Cancelled
        )
    }

    /// True for terminal states that are not `Succeeded`.
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != ProcessState::Succeeded
    }
}

crate::display_names! {
    ProcessState {
        RunRequested => "run_requested",
        Running => "running",
        Succeeded => "succeeded",
        RunRequestFailed => "run_request_failed",
        PythonException => "python_exception",
        NonZeroReturnCode => "non_zero_return_code",
        ResourcesNotAvailable => "resources_not_available",
        ErrorGettingState => "error_getting_state",
        Cancelled => "cancelled",
        Unknown => "unknown",
    }
}

/// A state transition report, carrying whatever the state rules populate:
/// pid or container id and log file once running, result bytes on success,
/// serialized exception on failure, return code on exit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessStateReport {
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
}

impl ProcessStateReport {
    pub fn new(state: ProcessState) -> Self {
        Self { state, ..Default::default() }
    }

    crate::opt_setters! {
        pid: u32,
        container_id: String,
        log_file_name: String,
        result: Blob,
        exception: Blob,
        return_code: i32,
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        ProcessState::Unknown
    }
}

#[cfg(test)]
#[path = "process_state_tests.rs"]
mod tests;
