// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod agents;
pub mod credentials;
pub mod run;
pub mod states;

use crate::output::{format_or_json, OutputFormat};
use anyhow::Result;
use mg_proto::{CoordinatorClient, HealthStatus};
use std::process::ExitCode;

pub async fn check(client: &CoordinatorClient, format: OutputFormat) -> Result<ExitCode> {
    let status = client.check("").await?;
    format_or_json(format, &serde_json::json!({ "status": status.to_string() }), || {
        println!("{}", status)
    })?;
    Ok(match status {
        HealthStatus::Serving => ExitCode::SUCCESS,
        HealthStatus::NotServing => ExitCode::FAILURE,
    })
}

pub async fn shutdown(client: &CoordinatorClient, format: OutputFormat) -> Result<ExitCode> {
    client.shutdown().await?;
    format_or_json(format, &serde_json::json!({ "shutting_down": true }), || {
        println!("coordinator shutting down")
    })?;
    Ok(ExitCode::SUCCESS)
}
