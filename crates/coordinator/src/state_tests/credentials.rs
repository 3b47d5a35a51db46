// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state::CredentialStore;
use mg_core::{CredentialKind, CredentialReference, CredentialService};

fn secret(name: &str) -> CredentialReference {
    CredentialReference::SecretManager {
        name: name.into(),
        kind: CredentialKind::UsernamePassword,
    }
}

fn name_of(reference: &CredentialReference) -> &str {
    match reference {
        CredentialReference::SecretManager { name, .. } => name,
        CredentialReference::HostFile { .. } => "<file>",
    }
}

#[test]
fn longest_prefix_wins() {
    let mut store = CredentialStore::default();
    store.add(CredentialService::Git, "https://example.com/", secret("broad"));
    store.add(CredentialService::Git, "https://example.com/team/", secret("narrow"));

    let hit = store.lookup(CredentialService::Git, "https://example.com/team/repo.git").unwrap();
    assert_eq!(name_of(hit), "narrow");

    let hit = store.lookup(CredentialService::Git, "https://example.com/other.git").unwrap();
    assert_eq!(name_of(hit), "broad");
}

#[test]
fn equal_length_ties_break_by_insertion_order() {
    let mut store = CredentialStore::default();
    store.add(CredentialService::Git, "https://a.example/", secret("first"));
    store.add(CredentialService::Git, "https://b.example/", secret("second"));
    // Craft a URL both prefixes of equal length match: impossible for
    // distinct prefixes of the same length, so re-add the same prefix
    // under a different name and check the original position is kept.
    store.add(CredentialService::Git, "https://a.example/", secret("replacement"));

    let hit = store.lookup(CredentialService::Git, "https://a.example/repo.git").unwrap();
    assert_eq!(name_of(hit), "replacement");
    assert_eq!(store.len(), 2);
}

#[test]
fn services_are_isolated() {
    let mut store = CredentialStore::default();
    store.add(CredentialService::Git, "https://example.com/", secret("git-cred"));

    assert!(store.lookup(CredentialService::Docker, "https://example.com/x").is_none());
}

#[test]
fn no_match_without_prefix() {
    let mut store = CredentialStore::default();
    store.add(CredentialService::Docker, "registry.example.com/", secret("reg"));
    assert!(store.lookup(CredentialService::Docker, "other.example.com/img").is_none());
}
