// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mg add-credentials` - register a credential source.

use crate::output::{format_or_json, OutputFormat};
use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use mg_core::{CredentialKind, CredentialReference, CredentialService};
use mg_proto::CoordinatorClient;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Clone, Copy, ValueEnum)]
enum ServiceArg {
    Git,
    Docker,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    UsernamePassword,
    SshKey,
}

#[derive(Args)]
pub struct AddCredentialsArgs {
    /// Which service the credentials authenticate against
    #[arg(long, value_enum)]
    service: ServiceArg,

    /// URL prefix the credentials apply to (most specific match wins)
    #[arg(long)]
    url: String,

    /// Shape of the secret material
    #[arg(long, value_enum)]
    kind: KindArg,

    /// Name of an entry in the coordinator's secret manager
    #[arg(long, conflicts_with = "file")]
    secret: Option<String>,

    /// Path to a file on the coordinator host
    #[arg(long)]
    file: Option<PathBuf>,
}

pub async fn add_credentials(
    client: &CoordinatorClient,
    args: AddCredentialsArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let service = match args.service {
        ServiceArg::Git => CredentialService::Git,
        ServiceArg::Docker => CredentialService::Docker,
    };
    let kind = match args.kind {
        KindArg::UsernamePassword => CredentialKind::UsernamePassword,
        KindArg::SshKey => CredentialKind::SshKey,
    };
    let reference = match (args.secret, args.file) {
        (Some(name), None) => CredentialReference::SecretManager { name, kind },
        (None, Some(path)) => CredentialReference::HostFile { path, kind },
        _ => bail!("exactly one of --secret or --file is required"),
    };

    client.add_credentials(service, args.url.clone(), reference).await?;
    format_or_json(
        format,
        &serde_json::json!({ "service": service.to_string(), "url": args.url }),
        || println!("credentials registered for {} {}", service, args.url),
    )?;
    Ok(ExitCode::SUCCESS)
}
