// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named resource vectors.
//!
//! Agents advertise totals (`cpu`, `memory`, ...), jobs request vectors, and
//! the coordinator's ledger does checked arithmetic between the two. A
//! component absent from a vector is zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation failures for a resource vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    #[error("resource '{name}' is negative ({value})")]
    NegativeComponent { name: String, value: f64 },

    #[error("resource '{name}' is not a finite number")]
    NonFiniteComponent { name: String },
}

/// A vector of named non-negative scalar capacities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resources(BTreeMap<String, f64>);

impl Resources {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a vector from name/amount pairs, rejecting negative or
    /// non-finite components.
    pub fn try_from_pairs<I, S>(pairs: I) -> Result<Self, ResourceError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, value) in pairs {
            let name = name.into();
            check_component(&name, value)?;
            map.insert(name, value);
        }
        Ok(Self(map))
    }

    /// Validate every component (used on vectors that arrived over the wire).
    pub fn validate(&self) -> Result<(), ResourceError> {
        for (name, value) in &self.0 {
            check_component(name, *value)?;
        }
        Ok(())
    }

    /// Amount of a single component; absent components are zero.
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    /// True when every component of `required` is available here.
    pub fn dominates(&self, required: &Resources) -> bool {
        required.0.iter().all(|(name, amount)| self.get(name) >= *amount)
    }

    /// Atomically subtract `required`: succeeds and mutates iff every
    /// component fits, otherwise leaves `self` untouched.
    pub fn subtract_checked(&mut self, required: &Resources) -> bool {
        if !self.dominates(required) {
            return false;
        }
        for (name, amount) in &required.0 {
            let entry = self.0.entry(name.clone()).or_insert(0.0);
            // Clamp float residue so repeated reserve/release cannot drift
            // a component below zero.
            *entry = (*entry - amount).max(0.0);
        }
        true
    }

    /// Add `amount` back, never exceeding `cap` component-wise.
    ///
    /// Returns `false` when a component had to be clamped, which means a
    /// release without a matching reservation.
    pub fn add_capped(&mut self, amount: &Resources, cap: &Resources) -> bool {
        let mut clamped = false;
        for (name, value) in &amount.0 {
            let limit = cap.get(name);
            let entry = self.0.entry(name.clone()).or_insert(0.0);
            let raw = *entry + value;
            if raw > limit + f64::EPSILON {
                clamped = true;
            }
            *entry = raw.min(limit);
        }
        !clamped
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Resources {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, value)| (name.into(), value)).collect())
    }
}

impl std::fmt::Display for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

fn check_component(name: &str, value: f64) -> Result<(), ResourceError> {
    if !value.is_finite() {
        return Err(ResourceError::NonFiniteComponent { name: name.to_string() });
    }
    if value < 0.0 {
        return Err(ResourceError::NegativeComponent { name: name.to_string(), value });
    }
    Ok(())
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
