// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner WebSocket framed JSON protocol: a tagged `#[serde(tag = "type")]`
//! enum per direction, matched on the discriminator by the receiving side.

use serde::{Deserialize, Serialize};

use crate::control::{LogLineWire, StepConfig};

/// Frames sent by a runner to the backend over `GET /ws/runner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunnerMessage {
    Register {
        #[serde(default)]
        runner_id: Option<String>,
        name: String,
        runner_type: String,
        #[serde(default)]
        labels: std::collections::BTreeMap<String, String>,
    },
    Ack {
        step_id: String,
    },
    Heartbeat,
    Log {
        step_id: String,
        lines: Vec<LogLineWire>,
    },
    StepComplete {
        step_id: String,
        exit_code: i32,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Frames sent by the backend to a runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendMessage {
    Registered { runner_id: String },
    ExecuteStep { step_id: String, execution_key: String, step_config: StepConfig },
    /// Tells a runner to stop work on a step it no longer owns.
    Abort { step_id: String },
    Pong,
    Error { message: String },
}

/// WebSocket close codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsCloseCode {
    RuntimeError,
    BadRegistration,
    SessionNotFound,
    IllegalState,
}

impl WsCloseCode {
    pub const fn code(self) -> u16 {
        match self {
            WsCloseCode::RuntimeError => 4000,
            WsCloseCode::BadRegistration => 4001,
            WsCloseCode::IllegalState => 4002,
            WsCloseCode::SessionNotFound => 4004,
        }
    }
}

#[cfg(test)]
#[path = "runner_ws_tests.rs"]
mod tests;
