// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary smoke tests: clean exit codes on help, nonzero on fatal init.

use assert_cmd::Command;
use serial_test::serial;

#[test]
#[serial]
fn mg_help_exits_zero() {
    Command::cargo_bin("mg").unwrap().arg("--help").assert().success();
}

#[test]
#[serial]
fn coordinator_rejects_unparseable_bind_address() {
    Command::cargo_bin("mg-coordinator")
        .unwrap()
        .args(["--bind", "not-an-address"])
        .assert()
        .failure();
}

#[test]
#[serial]
fn agent_fails_fast_without_a_coordinator() {
    Command::cargo_bin("mg-agent")
        .unwrap()
        .args(["--coordinator", "127.0.0.1:9", "--resource", "cpu=1"])
        .assert()
        .failure();
}

#[test]
#[serial]
fn mg_check_fails_when_unreachable() {
    Command::cargo_bin("mg")
        .unwrap()
        .args(["check", "--coordinator", "127.0.0.1:9"])
        .assert()
        .failure();
}
