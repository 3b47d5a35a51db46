// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource ledger: agent capacity, reservations, releases.

use super::GridState;
use mg_core::{AgentId, GridWorkerId, JobId, Resources};
use mg_proto::AgentStateEntry;
use std::collections::HashMap;
use tracing::{debug, warn};

/// What a reservation is held for: a whole job, or one grid worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservationKey {
    pub job_id: JobId,
    pub worker_id: Option<GridWorkerId>,
}

impl ReservationKey {
    pub fn job(job_id: JobId) -> Self {
        Self { job_id, worker_id: None }
    }

    pub fn worker(job_id: JobId, worker_id: GridWorkerId) -> Self {
        Self { job_id, worker_id: Some(worker_id) }
    }
}

/// A registered agent and its capacity.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub total: Resources,
    pub available: Resources,
    /// A job-specific agent serves only this job.
    pub job_affinity: Option<JobId>,
    /// Epoch ms of the last RPC from this agent; drives lost-agent sweeps.
    pub last_seen_ms: u64,
    /// Active reservations, so release and reset are exact.
    pub reservations: HashMap<ReservationKey, Resources>,
}

/// Outcome of a registration request.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Created,
    /// Same totals and affinity: a heartbeat, nothing to do.
    Unchanged,
    /// Totals or affinity changed: the agent restarted. Its previous
    /// reservations are orphaned; the caller must fail that work.
    Reset { orphaned: Vec<ReservationKey> },
}

impl GridState {
    /// Register an agent or refresh an existing registration.
    pub fn register_agent(
        &mut self,
        agent_id: &AgentId,
        total: Resources,
        job_affinity: Option<JobId>,
        now_ms: u64,
    ) -> Registration {
        match self.agents.get_mut(agent_id) {
            Some(record) if record.total == total && record.job_affinity == job_affinity => {
                record.last_seen_ms = now_ms;
                Registration::Unchanged
            }
            Some(record) => {
                // Conflicting re-registration: the agent restarted and its
                // in-flight work is assumed lost.
                warn!(agent_id = %agent_id, "agent re-registered with different totals");
                let orphaned = record.reservations.drain().map(|(key, _)| key).collect();
                record.available = total.clone();
                record.total = total;
                record.job_affinity = job_affinity;
                record.last_seen_ms = now_ms;
                Registration::Reset { orphaned }
            }
            None => {
                self.agents.insert(
                    agent_id.clone(),
                    AgentRecord {
                        available: total.clone(),
                        total,
                        job_affinity,
                        last_seen_ms: now_ms,
                        reservations: HashMap::new(),
                    },
                );
                Registration::Created
            }
        }
    }

    /// Atomically reserve `amount` on an agent for `key`. False when the
    /// agent is unknown or the resources do not fit.
    pub fn reserve(&mut self, agent_id: &AgentId, key: ReservationKey, amount: &Resources) -> bool {
        let Some(record) = self.agents.get_mut(agent_id) else { return false };
        if !record.available.subtract_checked(amount) {
            return false;
        }
        record.reservations.insert(key, amount.clone());
        true
    }

    /// Release the reservation held under `key`, if any.
    pub fn release(&mut self, agent_id: &AgentId, key: &ReservationKey) {
        let Some(record) = self.agents.get_mut(agent_id) else { return };
        let Some(amount) = record.reservations.remove(key) else {
            debug!(agent_id = %agent_id, job_id = %key.job_id, "release without reservation");
            return;
        };
        if !record.available.add_capped(&amount, &record.total) {
            warn!(agent_id = %agent_id, job_id = %key.job_id, "release exceeded agent totals");
        }
    }

    /// Refresh an agent's liveness stamp.
    pub fn touch_agent(&mut self, agent_id: &AgentId, now_ms: u64) {
        if let Some(record) = self.agents.get_mut(agent_id) {
            record.last_seen_ms = now_ms;
        }
    }

    /// Capacity snapshot of every agent.
    pub fn agent_snapshot(&self) -> Vec<AgentStateEntry> {
        let mut entries: Vec<AgentStateEntry> = self
            .agents
            .iter()
            .map(|(agent_id, record)| AgentStateEntry {
                agent_id: agent_id.clone(),
                total: record.total.clone(),
                available: record.available.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.agent_id.as_str().cmp(b.agent_id.as_str()));
        entries
    }
}
