// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state::GridWorker;
use mg_core::GridWorkerId;

fn with_worker(state: &mut GridState, job: &str, worker: &str) -> GridWorkerId {
    let worker_id = GridWorkerId::new(worker);
    let queue = state.jobs.get_mut(job).unwrap().tasks.as_mut().unwrap();
    queue.workers.insert(
        worker_id.clone(),
        GridWorker {
            agent_id: "a1".into(),
            current_task: None,
            report: report(ProcessState::RunRequested),
        },
    );
    worker_id
}

// ── Append and close ─────────────────────────────────────────────────────────

#[test]
fn append_preserves_arrival_order() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(5), task(1), task(3)], false).unwrap();
    let worker = with_worker(&mut state, "g", "gw-1");

    let order: Vec<u64> = std::iter::from_fn(|| {
        state.dequeue_task(&"g".into(), &worker).unwrap().map(|t| t.task_id.value())
    })
    .collect();
    assert_eq!(order, vec![5, 1, 3]);
}

#[test]
fn append_after_close_is_rejected() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], true).unwrap();

    let err = state.append_tasks(&"g".into(), vec![task(1)], false).unwrap_err();
    assert!(matches!(err, StateError::TasksClosed(_)));
    assert_eq!(state.jobs["g"].tasks.as_ref().unwrap().task_count(), 1);
}

#[test]
fn closing_with_empty_batch_is_allowed() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], false).unwrap();
    state.append_tasks(&"g".into(), vec![], true).unwrap();
    assert!(state.jobs["g"].tasks.as_ref().unwrap().is_closed());
}

#[test]
fn duplicate_task_id_rejects_whole_batch() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], false).unwrap();

    let err = state.append_tasks(&"g".into(), vec![task(9), task(0)], false).unwrap_err();
    assert!(matches!(err, StateError::DuplicateTask { .. }));
    // atomic: task 9 was not admitted either
    assert_eq!(state.jobs["g"].tasks.as_ref().unwrap().task_count(), 1);
}

#[test]
fn append_to_non_grid_job_is_rejected() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("plain").build());
    let err = state.append_tasks(&"plain".into(), vec![task(0)], false).unwrap_err();
    assert!(matches!(err, StateError::NotAGridJob(_)));
}

// ── Dequeue and ownership ────────────────────────────────────────────────────

#[test]
fn dequeue_records_worker_ownership() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0), task(1)], false).unwrap();
    let w1 = with_worker(&mut state, "g", "gw-1");
    let w2 = with_worker(&mut state, "g", "gw-2");

    let t0 = state.dequeue_task(&"g".into(), &w1).unwrap().unwrap();
    let t1 = state.dequeue_task(&"g".into(), &w2).unwrap().unwrap();
    assert_eq!(t0.task_id.value(), 0);
    assert_eq!(t1.task_id.value(), 1);

    // No task is delivered twice
    assert!(state.dequeue_task(&"g".into(), &w1).unwrap().is_none());

    let queue = state.jobs["g"].tasks.as_ref().unwrap();
    assert_eq!(queue.workers[&w1].current_task, Some(0u64.into()));
    assert_eq!(queue.workers[&w2].current_task, Some(1u64.into()));
}

#[test]
fn dequeue_from_unknown_worker_is_rejected() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], false).unwrap();
    let err = state.dequeue_task(&"g".into(), &"gw-ghost".into()).unwrap_err();
    assert!(matches!(err, StateError::UnknownWorker { .. }));
}

// ── Task state transitions ───────────────────────────────────────────────────

#[test]
fn task_terminal_is_write_once() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], false).unwrap();
    let worker = with_worker(&mut state, "g", "gw-1");
    state.dequeue_task(&"g".into(), &worker).unwrap();

    state.update_task(&"g".into(), 0u64.into(), report(ProcessState::Succeeded)).unwrap();
    state
        .update_task(&"g".into(), 0u64.into(), report(ProcessState::PythonException))
        .unwrap();

    let states = state.task_states(&"g".into(), &[]).unwrap();
    assert_eq!(states[0].report.state, ProcessState::Succeeded);
}

#[test]
fn terminal_task_frees_the_worker() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], false).unwrap();
    let worker = with_worker(&mut state, "g", "gw-1");
    state.dequeue_task(&"g".into(), &worker).unwrap();

    state.update_task(&"g".into(), 0u64.into(), report(ProcessState::Succeeded)).unwrap();
    let queue = state.jobs["g"].tasks.as_ref().unwrap();
    assert_eq!(queue.workers[&worker].current_task, None);
}

#[test]
fn ignore_set_filters_task_states() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0), task(1), task(2)], false).unwrap();

    let all = state.task_states(&"g".into(), &[]).unwrap();
    assert_eq!(all.len(), 3);

    let rest = state.task_states(&"g".into(), &[0u64.into(), 2u64.into()]).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].task_id.value(), 1);
}

// ── Synthetic grid state ─────────────────────────────────────────────────────

#[test]
fn open_queue_reads_running() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    assert_eq!(state.simple_job_state(&"g".into()).state, ProcessState::Running);
}

#[test]
fn closed_and_all_succeeded_reads_succeeded() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0), task(1)], true).unwrap();
    let worker = with_worker(&mut state, "g", "gw-1");
    for _ in 0..2 {
        let t = state.dequeue_task(&"g".into(), &worker).unwrap().unwrap();
        state.update_task(&"g".into(), t.task_id, report(ProcessState::Succeeded)).unwrap();
    }
    // Worker still attached: aggregate stays running
    assert_eq!(state.simple_job_state(&"g".into()).state, ProcessState::Running);

    state.remove_worker(&"g".into(), &worker, false);
    assert_eq!(state.simple_job_state(&"g".into()).state, ProcessState::Succeeded);
}

#[test]
fn closed_with_failure_reads_first_failure() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0), task(1)], true).unwrap();
    let worker = with_worker(&mut state, "g", "gw-1");
    for expect in [ProcessState::Succeeded, ProcessState::PythonException] {
        let t = state.dequeue_task(&"g".into(), &worker).unwrap().unwrap();
        state.update_task(&"g".into(), t.task_id, report(expect)).unwrap();
    }
    state.remove_worker(&"g".into(), &worker, false);
    assert_eq!(state.simple_job_state(&"g".into()).state, ProcessState::PythonException);
}

#[test]
fn open_queue_with_finished_tasks_still_reads_running() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], false).unwrap();
    let worker = with_worker(&mut state, "g", "gw-1");
    let t = state.dequeue_task(&"g".into(), &worker).unwrap().unwrap();
    state.update_task(&"g".into(), t.task_id, report(ProcessState::Succeeded)).unwrap();
    state.remove_worker(&"g".into(), &worker, false);

    assert_eq!(state.simple_job_state(&"g".into()).state, ProcessState::Running);
}

#[test]
fn remove_worker_can_fail_its_task() {
    let mut state = GridState::new();
    added(&mut state, grid_job("g"));
    state.append_tasks(&"g".into(), vec![task(0)], true).unwrap();
    let worker = with_worker(&mut state, "g", "gw-1");
    state.dequeue_task(&"g".into(), &worker).unwrap();

    assert!(state.remove_worker(&"g".into(), &worker, true));
    let states = state.task_states(&"g".into(), &[]).unwrap();
    assert_eq!(states[0].report.state, ProcessState::ErrorGettingState);
}
