// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: (service, URL prefix) → source, most-specific wins.

use mg_core::{CredentialReference, CredentialService};

/// One registered credential source.
#[derive(Debug, Clone)]
pub struct CredentialEntry {
    pub service: CredentialService,
    pub url_prefix: String,
    pub reference: CredentialReference,
}

/// Insert-order-preserving credential registry.
///
/// Lookup picks the entry with the longest `url_prefix` that prefixes the
/// requested URL; among equal lengths the earliest insertion wins. A
/// re-registration of the same (service, prefix) replaces in place, keeping
/// its original position.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: Vec<CredentialEntry>,
}

impl CredentialStore {
    pub fn add(
        &mut self,
        service: CredentialService,
        url_prefix: impl Into<String>,
        reference: CredentialReference,
    ) {
        let url_prefix = url_prefix.into();
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.service == service && e.url_prefix == url_prefix)
        {
            existing.reference = reference;
            return;
        }
        self.entries.push(CredentialEntry { service, url_prefix, reference });
    }

    /// Most-specific match for `url` under `service`.
    pub fn lookup(&self, service: CredentialService, url: &str) -> Option<&CredentialReference> {
        self.entries
            .iter()
            .filter(|e| e.service == service && url.starts_with(&e.url_prefix))
            // Replace only on strictly longer prefixes so insertion order
            // breaks ties.
            .fold(None::<&CredentialEntry>, |best, e| match best {
                Some(b) if e.url_prefix.len() <= b.url_prefix.len() => Some(b),
                _ => Some(e),
            })
            .map(|e| &e.reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
