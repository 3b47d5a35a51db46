// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mg run` - submit a command job and poll it to completion.

use crate::output::{format_or_json, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use mg_core::{
    CodeDeployment, InterpreterDeployment, Job, JobSpec, ProcessState, Resources,
};
use mg_proto::{AddJobOutcome, CoordinatorClient};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Args)]
pub struct RunArgs {
    /// Job id (random if omitted; resubmitting an existing id is a no-op)
    #[arg(long)]
    id: Option<String>,

    /// Friendly job name (defaults to the id)
    #[arg(long)]
    name: Option<String>,

    /// Relative scheduling weight
    #[arg(long, default_value_t = 1.0)]
    priority: f64,

    /// Resource requirement, e.g. --resource cpu=2
    #[arg(long = "resource", value_name = "NAME=AMOUNT", value_parser = parse_resource)]
    resources: Vec<(String, f64)>,

    /// Code folder available on the agent host (repeatable; first is cwd)
    #[arg(long = "folder", value_name = "PATH", required = true)]
    folders: Vec<PathBuf>,

    /// Interpreter available on the agent host
    #[arg(long, default_value = "/usr/bin/env")]
    interpreter: PathBuf,

    /// Environment variable for the job, e.g. --env KEY=VALUE
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    env: Vec<(String, String)>,

    /// Poll interval while waiting
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// The command to run
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

fn parse_resource(raw: &str) -> Result<(String, f64), String> {
    let (name, amount) =
        raw.split_once('=').ok_or_else(|| format!("expected NAME=AMOUNT, got '{}'", raw))?;
    let amount: f64 = amount.parse().map_err(|_| format!("'{}' is not a number", amount))?;
    Ok((name.to_string(), amount))
}

fn parse_env(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

pub async fn run(
    client: &CoordinatorClient,
    args: RunArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let id = args.id.unwrap_or_else(|| format!("run-{}", nanoid::nanoid!(10)));
    let job = Job {
        id: id.clone().into(),
        name: args.name.unwrap_or_else(|| id.clone()),
        priority: args.priority,
        interruption_probability_threshold: 0.0,
        code_deployment: CodeDeployment::ServerAvailableFolder { paths: args.folders },
        interpreter_deployment: InterpreterDeployment::ServerAvailableInterpreter {
            path: args.interpreter,
        },
        environment_variables: args.env.into_iter().collect::<HashMap<_, _>>(),
        resources_required: args.resources.into_iter().collect::<Resources>(),
        result_highest_pickle_protocol: 5,
        spec: JobSpec::Command { command_line: args.command, context_variables: None },
    };

    match client.add_job(job).await? {
        AddJobOutcome::Added => eprintln!("submitted {}", id),
        AddJobOutcome::IsDuplicate => eprintln!("{} already exists, watching it", id),
    }

    // Poll until terminal; errors are delivered as states, not RPC failures.
    let report = loop {
        let states = client.get_simple_job_states(vec![id.clone().into()]).await?;
        let Some(report) = states.into_iter().next() else {
            bail!("coordinator returned no state for {}", id);
        };
        if report.state.is_terminal() {
            break report;
        }
        tokio::time::sleep(Duration::from_millis(args.poll_ms)).await;
    };

    format_or_json(
        format,
        &serde_json::json!({
            "job_id": id,
            "state": report.state.to_string(),
            "return_code": report.return_code,
            "log_file": report.log_file_name,
        }),
        || match &report.log_file_name {
            Some(log) => println!("{}: {} (log: {})", id, report.state, log),
            None => println!("{}: {}", id, report.state),
        },
    )?;

    Ok(match report.state {
        ProcessState::Succeeded => ExitCode::SUCCESS,
        ProcessState::NonZeroReturnCode => {
            let code = report.return_code.unwrap_or(1).clamp(1, 255) as u8;
            ExitCode::from(code)
        }
        _ => ExitCode::FAILURE,
    })
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
