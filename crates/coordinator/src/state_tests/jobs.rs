// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// ── Admission ────────────────────────────────────────────────────────────────

#[test]
fn add_then_resubmit_is_duplicate() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("j1").build());

    // Content is irrelevant; the id decides.
    let different = Job::builder().id("j1").name("something else").priority(9.0).build();
    assert_eq!(state.add_job(different, 2_000).unwrap(), AddJobOutcome::IsDuplicate);
    assert_eq!(state.jobs.len(), 1);
    assert_eq!(state.jobs["j1"].job.name, "test-job");
}

#[test]
fn resubmit_after_terminal_is_still_duplicate() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("j1").build());
    state.update_job_state(&"j1".into(), report(ProcessState::Succeeded));

    let outcome = state.add_job(Job::builder().id("j1").build(), 2_000).unwrap();
    assert_eq!(outcome, AddJobOutcome::IsDuplicate);
    assert_eq!(state.simple_job_state(&"j1".into()).state, ProcessState::Succeeded);
}

#[test]
fn invalid_job_changes_nothing() {
    let mut state = GridState::new();
    let err = state.add_job(Job::builder().id("bad id").build(), 1_000);
    assert!(err.is_err());
    assert!(state.jobs.is_empty());
}

#[test]
fn admitted_jobs_start_run_requested() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("j1").build());
    assert_eq!(state.simple_job_state(&"j1".into()).state, ProcessState::RunRequested);
}

#[test]
fn submission_seq_is_monotonic() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("j1").build());
    added(&mut state, Job::builder().id("j2").build());
    assert!(state.jobs["j1"].seq < state.jobs["j2"].seq);
}

// ── State transitions ────────────────────────────────────────────────────────

#[test]
fn run_requested_to_running_to_succeeded() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("j1").build());
    state.update_job_state(&"j1".into(), report(ProcessState::Running).pid(31u32));
    assert_eq!(state.simple_job_state(&"j1".into()).pid, Some(31));

    state.update_job_state(&"j1".into(), report(ProcessState::Succeeded).return_code(0));
    let last = state.simple_job_state(&"j1".into());
    assert_eq!(last.state, ProcessState::Succeeded);
    assert_eq!(last.return_code, Some(0));
}

#[test]
fn terminal_state_is_write_once() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("j1").build());
    state.update_job_state(&"j1".into(), report(ProcessState::NonZeroReturnCode).return_code(3));

    // Neither another terminal state nor a regression sticks
    state.update_job_state(&"j1".into(), report(ProcessState::Succeeded));
    state.update_job_state(&"j1".into(), report(ProcessState::Running));

    let last = state.simple_job_state(&"j1".into());
    assert_eq!(last.state, ProcessState::NonZeroReturnCode);
    assert_eq!(last.return_code, Some(3));
}

#[test]
fn idempotent_terminal_retry_is_quiet() {
    let mut state = GridState::new();
    added(&mut state, Job::builder().id("j1").build());
    state.update_job_state(&"j1".into(), report(ProcessState::Succeeded));
    state.update_job_state(&"j1".into(), report(ProcessState::Succeeded));
    assert_eq!(state.simple_job_state(&"j1".into()).state, ProcessState::Succeeded);
}

#[test]
fn unknown_ids_answer_unknown() {
    let state = GridState::new();
    assert_eq!(state.simple_job_state(&"ghost".into()).state, ProcessState::Unknown);
}

#[test]
fn update_for_unknown_job_is_ignored() {
    let mut state = GridState::new();
    state.update_job_state(&"ghost".into(), report(ProcessState::Running));
    assert!(state.jobs.is_empty());
}

// ── Terminal monotonicity property ───────────────────────────────────────────

use proptest::prelude::*;

fn any_state() -> impl Strategy<Value = ProcessState> {
    prop::sample::select(vec![
        ProcessState::RunRequested,
        ProcessState::Running,
        ProcessState::Succeeded,
        ProcessState::RunRequestFailed,
        ProcessState::PythonException,
        ProcessState::NonZeroReturnCode,
        ProcessState::ResourcesNotAvailable,
        ProcessState::ErrorGettingState,
    ])
}

proptest! {
    // Whatever update sequence arrives, the first terminal state sticks.
    #[test]
    fn terminal_states_are_sticky(updates in proptest::collection::vec(any_state(), 1..24)) {
        let mut state = GridState::new();
        added(&mut state, Job::builder().id("j1").build());

        let mut first_terminal = None;
        for next in updates {
            state.update_job_state(&"j1".into(), report(next));
            if first_terminal.is_none() && next.is_terminal() {
                first_terminal = Some(next);
            }
        }
        if let Some(expect) = first_terminal {
            prop_assert_eq!(state.simple_job_state(&"j1".into()).state, expect);
        }
    }
}
