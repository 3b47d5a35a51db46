// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job registry: admission, state transitions, state queries.

use super::tasks::GridTaskQueue;
use super::{GridState, StateError};
use mg_core::{AgentId, Job, JobId, ProcessState, ProcessStateReport};
use mg_proto::AddJobOutcome;
use tracing::{debug, warn};

/// A submitted job plus everything the coordinator tracks about it.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Immutable after admission; branch/tag deployments already resolved.
    pub job: Job,
    /// Submission order, used for scheduling tie-breaks.
    pub seq: u64,
    pub submitted_at_ms: u64,
    /// Current state of the job itself. For grid jobs this only carries
    /// coordinator-level outcomes (`resources_not_available`); the
    /// client-visible state is synthesized from the task queue.
    pub report: ProcessStateReport,
    /// The agent running a non-grid job. Grid workers live on the queue.
    pub assigned_agent: Option<AgentId>,
    /// Present iff the job spec is a grid.
    pub tasks: Option<GridTaskQueue>,
}

impl GridState {
    /// Admit a job. Validation failures change nothing; a known id is a
    /// duplicate regardless of content.
    pub fn add_job(
        &mut self,
        job: Job,
        now_ms: u64,
    ) -> Result<AddJobOutcome, StateError> {
        job.validate()?;
        if self.jobs.contains_key(&job.id) {
            debug!(job_id = %job.id, "duplicate submission");
            return Ok(AddJobOutcome::IsDuplicate);
        }
        let tasks = job.is_grid().then(GridTaskQueue::new);
        let seq = self.take_seq();
        let record = JobRecord {
            job: job.clone(),
            seq,
            submitted_at_ms: now_ms,
            report: ProcessStateReport::new(ProcessState::RunRequested),
            assigned_agent: None,
            tasks,
        };
        self.jobs.insert(job.id.clone(), record);
        Ok(AddJobOutcome::Added)
    }

    /// Apply a state transition to a job. Terminal states are write-once:
    /// an identical retry is ignored quietly, anything else loudly.
    pub fn update_job_state(&mut self, job_id: &JobId, report: ProcessStateReport) {
        let Some(record) = self.jobs.get_mut(job_id) else {
            warn!(job_id = %job_id, "state update for unknown job");
            return;
        };
        let current = record.report.state;
        if current.is_terminal() {
            if current == report.state {
                debug!(job_id = %job_id, state = %current, "idempotent terminal retry");
            } else {
                warn!(
                    job_id = %job_id,
                    current = %current,
                    requested = %report.state,
                    "ignoring transition out of terminal state"
                );
            }
            return;
        }
        record.report = report;
    }

    /// Client-visible state for one id. Unknown ids answer `unknown`; grid
    /// jobs answer their synthetic aggregate.
    pub fn simple_job_state(&self, job_id: &JobId) -> ProcessStateReport {
        match self.jobs.get(job_id) {
            None => ProcessStateReport::new(ProcessState::Unknown),
            Some(record) => match &record.tasks {
                None => record.report.clone(),
                Some(queue) => {
                    if record.report.state.is_terminal() {
                        record.report.clone()
                    } else {
                        ProcessStateReport::new(queue.synthetic_state())
                    }
                }
            },
        }
    }
}
