// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state::{Registration, ReservationKey};

fn key(job: &str) -> ReservationKey {
    ReservationKey::job(job.into())
}

// ── Registration ─────────────────────────────────────────────────────────────

#[test]
fn first_registration_creates() {
    let mut state = GridState::new();
    let outcome = state.register_agent(&"a1".into(), res(&[("cpu", 4.0)]), None, 1_000);
    assert_eq!(outcome, Registration::Created);
    assert_eq!(state.agents["a1"].available.get("cpu"), 4.0);
}

#[test]
fn same_totals_is_a_heartbeat() {
    let mut state = GridState::new();
    state.register_agent(&"a1".into(), res(&[("cpu", 4.0)]), None, 1_000);
    assert!(state.reserve(&"a1".into(), key("j1"), &res(&[("cpu", 1.0)])));

    let outcome = state.register_agent(&"a1".into(), res(&[("cpu", 4.0)]), None, 9_000);
    assert_eq!(outcome, Registration::Unchanged);
    // Reservations survive a heartbeat
    assert_eq!(state.agents["a1"].available.get("cpu"), 3.0);
    assert_eq!(state.agents["a1"].last_seen_ms, 9_000);
}

#[test]
fn changed_totals_reset_and_orphan_reservations() {
    let mut state = GridState::new();
    state.register_agent(&"a1".into(), res(&[("cpu", 4.0)]), None, 1_000);
    assert!(state.reserve(&"a1".into(), key("j1"), &res(&[("cpu", 2.0)])));

    let outcome = state.register_agent(&"a1".into(), res(&[("cpu", 8.0)]), None, 2_000);
    match outcome {
        Registration::Reset { orphaned } => assert_eq!(orphaned, vec![key("j1")]),
        other => panic!("expected reset, got {:?}", other),
    }
    assert_eq!(state.agents["a1"].available.get("cpu"), 8.0);
    assert!(state.agents["a1"].reservations.is_empty());
}

// ── Reserve / release ────────────────────────────────────────────────────────

#[test]
fn reserve_is_atomic() {
    let mut state = GridState::new();
    state.register_agent(&"a1".into(), res(&[("cpu", 4.0), ("memory", 8.0)]), None, 1_000);

    assert!(!state.reserve(&"a1".into(), key("j1"), &res(&[("cpu", 2.0), ("memory", 9.0)])));
    assert_eq!(state.agents["a1"].available.get("cpu"), 4.0);

    assert!(state.reserve(&"a1".into(), key("j1"), &res(&[("cpu", 2.0), ("memory", 8.0)])));
    assert_eq!(state.agents["a1"].available.get("cpu"), 2.0);
    assert_eq!(state.agents["a1"].available.get("memory"), 0.0);
}

#[test]
fn release_restores_exactly_what_was_reserved() {
    let mut state = GridState::new();
    state.register_agent(&"a1".into(), res(&[("cpu", 4.0)]), None, 1_000);
    state.reserve(&"a1".into(), key("j1"), &res(&[("cpu", 3.0)]));
    state.release(&"a1".into(), &key("j1"));
    assert_eq!(state.agents["a1"].available.get("cpu"), 4.0);

    // Double release is a logged no-op, not extra capacity
    state.release(&"a1".into(), &key("j1"));
    assert_eq!(state.agents["a1"].available.get("cpu"), 4.0);
}

#[test]
fn reserve_on_unknown_agent_fails() {
    let mut state = GridState::new();
    assert!(!state.reserve(&"ghost".into(), key("j1"), &res(&[("cpu", 1.0)])));
}

#[test]
fn snapshot_is_sorted_and_complete() {
    let mut state = GridState::new();
    state.register_agent(&"b".into(), res(&[("cpu", 2.0)]), None, 1_000);
    state.register_agent(&"a".into(), res(&[("cpu", 4.0)]), None, 1_000);
    state.reserve(&"a".into(), key("j1"), &res(&[("cpu", 1.0)]));

    let snapshot = state.agent_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].agent_id, "a");
    assert_eq!(snapshot[0].total.get("cpu"), 4.0);
    assert_eq!(snapshot[0].available.get("cpu"), 3.0);
    assert_eq!(snapshot[1].agent_id, "b");
}
