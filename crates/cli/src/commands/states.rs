// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mg states` and `mg task-states` - state queries.

use crate::output::{format_or_json, OutputFormat};
use anyhow::Result;
use clap::Args;
use mg_proto::CoordinatorClient;
use std::process::ExitCode;

#[derive(Args)]
pub struct StatesArgs {
    /// Job ids to query
    #[arg(required = true)]
    job_ids: Vec<String>,
}

#[derive(Args)]
pub struct TaskStatesArgs {
    /// Grid job id
    job_id: String,

    /// Task ids to skip (already known to the caller)
    #[arg(long = "ignore", value_name = "TASK_ID")]
    ignore: Vec<u64>,
}

pub async fn states(
    client: &CoordinatorClient,
    args: StatesArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let ids = args.job_ids.clone();
    let reports = client
        .get_simple_job_states(ids.iter().map(|id| id.as_str().into()).collect())
        .await?;

    let rows: Vec<serde_json::Value> = ids
        .iter()
        .zip(&reports)
        .map(|(id, report)| {
            serde_json::json!({
                "job_id": id,
                "state": report.state.to_string(),
                "return_code": report.return_code,
            })
        })
        .collect();
    format_or_json(format, &serde_json::Value::Array(rows), || {
        for (id, report) in ids.iter().zip(&reports) {
            match report.return_code {
                Some(code) => println!("{}  {} (exit {})", id, report.state, code),
                None => println!("{}  {}", id, report.state),
            }
        }
    })?;
    Ok(ExitCode::SUCCESS)
}

pub async fn task_states(
    client: &CoordinatorClient,
    args: TaskStatesArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let entries = client
        .get_grid_task_states(
            args.job_id.as_str().into(),
            args.ignore.iter().map(|id| (*id).into()).collect(),
        )
        .await?;

    let rows: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| {
            serde_json::json!({
                "task_id": entry.task_id.value(),
                "state": entry.report.state.to_string(),
                "return_code": entry.report.return_code,
            })
        })
        .collect();
    format_or_json(format, &serde_json::Value::Array(rows), || {
        for entry in &entries {
            println!("{}  {}", entry.task_id, entry.report.state);
        }
    })?;
    Ok(ExitCode::SUCCESS)
}
