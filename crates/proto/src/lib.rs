// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for coordinator communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload, one
//! request/response exchange per TCP connection.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod request;
mod response;
mod types;
mod wire;

pub use client::{ClientError, CoordinatorClient};
pub use request::{JobStateUpdate, Request, TaskStateUpdate};
pub use response::{AddJobOutcome, HealthStatus, Response};
pub use types::{AgentStateEntry, JobToRun, TaskStateEntry};
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, MAX_MESSAGE_BYTES,
};

/// Protocol version exchanged in the Hello handshake.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
