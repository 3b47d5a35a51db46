// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mg_core::CredentialKind;

#[tokio::test]
async fn host_file_reads_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deploy.key");
    std::fs::write(&path, b"-----KEY-----").unwrap();

    let fetcher = HostCredentialFetcher::new(None);
    let creds = fetcher
        .fetch(&CredentialReference::HostFile { path, kind: CredentialKind::SshKey })
        .await
        .unwrap();
    assert_eq!(creds.kind, CredentialKind::SshKey);
    assert_eq!(creds.data.as_bytes(), b"-----KEY-----");
}

#[tokio::test]
async fn missing_host_file_is_an_error() {
    let fetcher = HostCredentialFetcher::new(None);
    let err = fetcher
        .fetch(&CredentialReference::HostFile {
            path: "/nonexistent/key".into(),
            kind: CredentialKind::SshKey,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialFetchError::File { .. }));
}

#[tokio::test]
async fn secret_command_substitutes_name_and_captures_stdout() {
    let fetcher = HostCredentialFetcher::new(Some("printf '%s' {name}".to_string()));
    let creds = fetcher
        .fetch(&CredentialReference::SecretManager {
            name: "registry-login".into(),
            kind: CredentialKind::UsernamePassword,
        })
        .await
        .unwrap();
    assert_eq!(creds.data.as_bytes(), b"registry-login");
}

#[tokio::test]
async fn failing_secret_command_reports_stderr() {
    let fetcher =
        HostCredentialFetcher::new(Some("echo 'no such secret' >&2; exit 1".to_string()));
    let err = fetcher
        .fetch(&CredentialReference::SecretManager {
            name: "ghost".into(),
            kind: CredentialKind::UsernamePassword,
        })
        .await
        .unwrap_err();
    match err {
        CredentialFetchError::SecretLookup { message, .. } => {
            assert!(message.contains("no such secret"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn secret_without_command_is_rejected() {
    let fetcher = HostCredentialFetcher::new(None);
    let err = fetcher
        .fetch(&CredentialReference::SecretManager {
            name: "x".into(),
            kind: CredentialKind::UsernamePassword,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialFetchError::NoSecretCommand));
}
