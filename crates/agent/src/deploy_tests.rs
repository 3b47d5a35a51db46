// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn folder_deployment_uses_first_path_as_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let code = dir.path().join("code");
    let libs = dir.path().join("libs");
    std::fs::create_dir_all(&code).unwrap();

    let resolved = resolve_code(
        &CodeDeployment::ServerAvailableFolder { paths: vec![code.clone(), libs.clone()] },
        dir.path(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(resolved.working_dir, code);
    assert_eq!(resolved.code_paths, vec![code, libs]);
}

#[tokio::test]
async fn missing_folder_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolve_code(
        &CodeDeployment::ServerAvailableFolder {
            paths: vec![dir.path().join("nope")],
        },
        dir.path(),
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DeployError::MissingFolder(_)));
}

#[tokio::test]
async fn empty_folder_list_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolve_code(
        &CodeDeployment::ServerAvailableFolder { paths: vec![] },
        dir.path(),
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DeployError::EmptyFolderList));
}

#[tokio::test]
async fn unpinned_branch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolve_code(
        &CodeDeployment::GitRepoBranch {
            url: "https://example.com/r.git".into(),
            branch: "main".into(),
            path_to_source: None,
        },
        dir.path(),
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DeployError::UnpinnedReference));
}

#[tokio::test]
async fn cached_checkout_is_reused_without_network() {
    // Fabricate a cache hit: the checkout dir exists with a .git marker.
    let dir = tempfile::tempdir().unwrap();
    let url = "https://example.com/repo.git";
    let checkout = dir
        .path()
        .join("git")
        .join(sanitize(url))
        .join("abc123");
    std::fs::create_dir_all(checkout.join(".git")).unwrap();

    let resolved = resolve_code(
        &CodeDeployment::GitRepoCommit {
            url: url.into(),
            commit: "abc123".into(),
            path_to_source: Some("src".into()),
        },
        dir.path(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(resolved.working_dir, checkout.join("src"));
}

#[tokio::test]
async fn host_interpreter_passes_through() {
    let resolved = resolve_interpreter(
        &InterpreterDeployment::ServerAvailableInterpreter {
            path: "/usr/bin/python3".into(),
        },
        None,
    )
    .await
    .unwrap();
    assert_eq!(resolved, ResolvedInterpreter::Host { path: "/usr/bin/python3".into() });
}

#[tokio::test]
async fn preloaded_container_needs_no_pull() {
    let resolved = resolve_interpreter(
        &InterpreterDeployment::ServerAvailableContainer { image_id: "sha256:cafe".into() },
        None,
    )
    .await
    .unwrap();
    assert_eq!(resolved, ResolvedInterpreter::Container { image: "sha256:cafe".into() });
}

#[test]
fn sanitize_keeps_urls_path_safe() {
    assert_eq!(
        sanitize("https://example.com/team/repo.git"),
        "https___example.com_team_repo.git"
    );
}
