// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grid-task registry: per-grid-job FIFO queue plus per-task state records.

use super::{GridState, StateError};
use mg_core::{
    AgentId, GridTask, GridWorkerId, JobId, ProcessState, ProcessStateReport, TaskId,
};
use mg_proto::TaskStateEntry;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, warn};

/// One task and its lifecycle, independent of the parent job's.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task: GridTask,
    pub report: ProcessStateReport,
    /// The worker that owns the task from dequeue until a terminal state.
    pub worker: Option<GridWorkerId>,
}

/// A grid worker: an agent's execution context for this job.
#[derive(Debug, Clone)]
pub struct GridWorker {
    pub agent_id: AgentId,
    /// The task currently dispatched to this worker, if any.
    pub current_task: Option<TaskId>,
    /// Last state the agent reported for the worker process.
    pub report: ProcessStateReport,
}

/// Append-only task list with a close latch and the workers consuming it.
#[derive(Debug, Clone, Default)]
pub struct GridTaskQueue {
    /// Task ids not yet dispatched, in arrival order.
    pending: VecDeque<TaskId>,
    /// All tasks ever added. BTreeMap so state listings are id-ordered.
    records: BTreeMap<TaskId, TaskRecord>,
    /// Monotonic: once true, `append` is rejected.
    all_tasks_added: bool,
    pub workers: HashMap<GridWorkerId, GridWorker>,
}

impl GridTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.all_tasks_added
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.records.len()
    }

    /// True when some agent already hosts a worker for this queue.
    pub fn has_worker_on(&self, agent_id: &AgentId) -> bool {
        self.workers.values().any(|w| &w.agent_id == agent_id)
    }

    /// The synthetic client-visible state of the whole grid job.
    ///
    /// Running while the queue is open, any task is non-terminal, or any
    /// worker still exists; after that, the first failing task (in id
    /// order) decides, and an all-succeeded drained queue reads succeeded.
    pub fn synthetic_state(&self) -> ProcessState {
        if !self.all_tasks_added {
            return ProcessState::Running;
        }
        if self.records.values().any(|r| !r.report.state.is_terminal()) {
            return ProcessState::Running;
        }
        if !self.workers.is_empty() {
            return ProcessState::Running;
        }
        for record in self.records.values() {
            if record.report.state.is_failure() {
                return record.report.state;
            }
        }
        ProcessState::Succeeded
    }
}

impl GridState {
    /// Append tasks to a grid job's queue; `all_tasks_added` closes it.
    pub fn append_tasks(
        &mut self,
        job_id: &JobId,
        tasks: Vec<GridTask>,
        all_tasks_added: bool,
    ) -> Result<(), StateError> {
        let record = self.jobs.get_mut(job_id).ok_or_else(|| {
            StateError::UnknownJob(job_id.clone())
        })?;
        let queue = record
            .tasks
            .as_mut()
            .ok_or_else(|| StateError::NotAGridJob(job_id.clone()))?;
        if queue.all_tasks_added {
            return Err(StateError::TasksClosed(job_id.clone()));
        }
        // Reject before touching the queue so a bad batch is atomic.
        for task in &tasks {
            if queue.records.contains_key(&task.task_id) {
                return Err(StateError::DuplicateTask {
                    job_id: job_id.clone(),
                    task_id: task.task_id,
                });
            }
        }
        for task in tasks {
            queue.pending.push_back(task.task_id);
            queue.records.insert(
                task.task_id,
                TaskRecord {
                    task,
                    report: ProcessStateReport::new(ProcessState::RunRequested),
                    worker: None,
                },
            );
        }
        if all_tasks_added {
            queue.all_tasks_added = true;
        }
        Ok(())
    }

    /// Pop the next task for `worker_id`, recording ownership. `Ok(None)`
    /// means nothing is queued; the caller distinguishes open from closed.
    pub fn dequeue_task(
        &mut self,
        job_id: &JobId,
        worker_id: &GridWorkerId,
    ) -> Result<Option<GridTask>, StateError> {
        let queue = self.grid_queue_mut(job_id)?;
        if !queue.workers.contains_key(worker_id) {
            return Err(StateError::UnknownWorker {
                job_id: job_id.clone(),
                worker_id: worker_id.to_string(),
            });
        }
        let Some(task_id) = queue.pending.pop_front() else {
            return Ok(None);
        };
        // Queue entries always have records; a miss is a bug we surface
        // by treating the queue as empty rather than panicking.
        let Some(record) = queue.records.get_mut(&task_id) else {
            warn!(job_id = %job_id, task_id = %task_id, "queued task has no record");
            return Ok(None);
        };
        record.report = ProcessStateReport::new(ProcessState::RunRequested);
        record.worker = Some(worker_id.clone());
        if let Some(worker) = queue.workers.get_mut(worker_id) {
            worker.current_task = Some(task_id);
        }
        Ok(Some(record.task.clone()))
    }

    /// Apply a state transition to one task. Terminal is write-once, like
    /// job states; non-terminal updates overwrite.
    pub fn update_task(
        &mut self,
        job_id: &JobId,
        task_id: TaskId,
        report: ProcessStateReport,
    ) -> Result<(), StateError> {
        let queue = self.grid_queue_mut(job_id)?;
        let Some(record) = queue.records.get_mut(&task_id) else {
            warn!(job_id = %job_id, task_id = %task_id, "state update for unknown task");
            return Ok(());
        };
        let current = record.report.state;
        if current.is_terminal() {
            if current == report.state {
                debug!(job_id = %job_id, task_id = %task_id, "idempotent terminal retry");
            } else {
                warn!(
                    job_id = %job_id,
                    task_id = %task_id,
                    current = %current,
                    requested = %report.state,
                    "ignoring task transition out of terminal state"
                );
            }
            return Ok(());
        }
        if report.state.is_terminal() {
            // Ownership ends with the task.
            if let Some(worker_id) = record.worker.as_ref() {
                if let Some(worker) = queue.workers.get_mut(worker_id) {
                    if worker.current_task == Some(task_id) {
                        worker.current_task = None;
                    }
                }
            }
        }
        record.report = report;
        Ok(())
    }

    /// All task states except the ids in `ignore` (clients poll
    /// incrementally with a growing ignore set).
    pub fn task_states(
        &self,
        job_id: &JobId,
        ignore: &[TaskId],
    ) -> Result<Vec<TaskStateEntry>, StateError> {
        let record = self.jobs.get(job_id).ok_or_else(|| {
            StateError::UnknownJob(job_id.clone())
        })?;
        let queue = record
            .tasks
            .as_ref()
            .ok_or_else(|| StateError::NotAGridJob(job_id.clone()))?;
        let ignore: std::collections::HashSet<TaskId> = ignore.iter().copied().collect();
        Ok(queue
            .records
            .iter()
            .filter(|(task_id, _)| !ignore.contains(task_id))
            .map(|(task_id, record)| TaskStateEntry {
                task_id: *task_id,
                report: record.report.clone(),
            })
            .collect())
    }

    /// Remove a worker from a grid job, failing its in-flight task (used
    /// when the worker exits abnormally or its agent is lost).
    ///
    /// Returns true when the worker existed.
    pub fn remove_worker(
        &mut self,
        job_id: &JobId,
        worker_id: &GridWorkerId,
        fail_current_task: bool,
    ) -> bool {
        let Some(record) = self.jobs.get_mut(job_id) else { return false };
        let Some(queue) = record.tasks.as_mut() else { return false };
        let Some(worker) = queue.workers.remove(worker_id) else { return false };
        if fail_current_task {
            if let Some(task_id) = worker.current_task {
                if let Some(task) = queue.records.get_mut(&task_id) {
                    if !task.report.state.is_terminal() {
                        task.report =
                            ProcessStateReport::new(ProcessState::ErrorGettingState);
                    }
                }
            }
        }
        true
    }

    fn grid_queue_mut(&mut self, job_id: &JobId) -> Result<&mut GridTaskQueue, StateError> {
        let record = self.jobs.get_mut(job_id).ok_or_else(|| {
            StateError::UnknownJob(job_id.clone())
        })?;
        record
            .tasks
            .as_mut()
            .ok_or_else(|| StateError::NotAGridJob(job_id.clone()))
    }
}
