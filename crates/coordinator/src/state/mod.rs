// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory coordinator state.
//!
//! One [`GridState`] holds everything the coordinator knows: the job
//! registry, per-grid-job task queues, the agent resource ledger, and the
//! credential store. It lives behind a single `parking_lot::Mutex` in the
//! listener context; every method here runs under that lock and none of
//! them block.

mod credentials;
mod jobs;
mod ledger;
mod tasks;

pub use credentials::{CredentialEntry, CredentialStore};
pub use jobs::JobRecord;
pub use ledger::{AgentRecord, Registration, ReservationKey};
pub use tasks::{GridTaskQueue, GridWorker, TaskRecord};

use mg_core::{AgentId, JobError, JobId, ResourceError, TaskId};
use std::collections::HashMap;
use thiserror::Error;

/// Rejections surfaced synchronously to the requesting client. State is
/// never modified when one of these is returned.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("unknown job '{0}'")]
    UnknownJob(JobId),

    #[error("job '{0}' is not a grid job")]
    NotAGridJob(JobId),

    #[error("job '{0}' already has all tasks added")]
    TasksClosed(JobId),

    #[error("job '{job_id}': task {task_id} already exists")]
    DuplicateTask { job_id: JobId, task_id: TaskId },

    #[error("job '{job_id}': unknown grid worker '{worker_id}'")]
    UnknownWorker { job_id: JobId, worker_id: String },
}

/// Everything the coordinator tracks, in memory only.
#[derive(Debug, Default)]
pub struct GridState {
    pub jobs: HashMap<JobId, JobRecord>,
    pub agents: HashMap<AgentId, AgentRecord>,
    pub credentials: CredentialStore,
    /// Monotonic submission counter; orders jobs for scheduling.
    next_seq: u64,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[cfg(test)]
#[path = "../state_tests/mod.rs"]
mod tests;
