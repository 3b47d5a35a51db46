// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mg agents` - ledger snapshot.

use crate::output::{format_or_json, OutputFormat};
use anyhow::Result;
use mg_proto::CoordinatorClient;
use std::process::ExitCode;

pub async fn agents(client: &CoordinatorClient, format: OutputFormat) -> Result<ExitCode> {
    let agents = client.get_agent_states().await?;

    let rows: Vec<serde_json::Value> = agents
        .iter()
        .map(|agent| {
            serde_json::json!({
                "agent_id": agent.agent_id.to_string(),
                "total": agent.total,
                "available": agent.available,
            })
        })
        .collect();
    format_or_json(format, &serde_json::Value::Array(rows), || {
        if agents.is_empty() {
            println!("no agents registered");
            return;
        }
        for agent in &agents {
            println!(
                "{}  total: {}  available: {}",
                agent.agent_id, agent.total, agent.available
            );
        }
    })?;
    Ok(ExitCode::SUCCESS)
}
