// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level scenario tests: a real coordinator on an ephemeral
//! port, driven by real agents where the scenario allows it and scripted
//! agent clients where it needs a runtime the test host does not have.

mod specs {
    mod helpers;

    mod cli;
    mod grid;
    mod jobs;
    mod liveness;
}
