// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mg` - meadowgrid client and one-shot job runner.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mg_proto::CoordinatorClient;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mg", version, about = "meadowgrid client")]
struct Cli {
    /// Coordinator address
    #[arg(long, global = true, env = "MG_COORDINATOR_ADDR", default_value = "127.0.0.1:15319")]
    coordinator: String,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a command job and wait for it to finish
    Run(commands::run::RunArgs),
    /// Query job states by id
    States(commands::states::StatesArgs),
    /// Query per-task states of a grid job
    TaskStates(commands::states::TaskStatesArgs),
    /// List registered agents and their capacity
    Agents,
    /// Register a credential source on the coordinator
    AddCredentials(commands::credentials::AddCredentialsArgs),
    /// Coordinator health check
    Check,
    /// Ask the coordinator to shut down
    Shutdown,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = CoordinatorClient::new(cli.coordinator.clone());
    let format = output::OutputFormat::from_json_flag(cli.json);

    let result: Result<ExitCode> = match cli.command {
        Command::Run(args) => commands::run::run(&client, args, format).await,
        Command::States(args) => commands::states::states(&client, args, format).await,
        Command::TaskStates(args) => commands::states::task_states(&client, args, format).await,
        Command::Agents => commands::agents::agents(&client, format).await,
        Command::AddCredentials(args) => {
            commands::credentials::add_credentials(&client, args, format).await
        }
        Command::Check => commands::check(&client, format).await,
        Command::Shutdown => commands::shutdown(&client, format).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
