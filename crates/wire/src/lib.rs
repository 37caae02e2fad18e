// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lazyaf-wire: serde wire types for the engine's external interfaces
//! — the step control-plane HTTP API, the runner WebSocket protocol,
//! the debug session HTTP/terminal API, and the admin pipeline API.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod control;
pub mod debug;
pub mod http_status;
pub mod pipeline;
pub mod runner_ws;

pub use control::{
    HeartbeatRequest, LogLineWire, LogStreamWire, LogsRequest, StatusRequest, StepConfig,
    StepSnapshot, StepStatusKind,
};
pub use debug::{
    DebugRerunRequest, DebugRerunResponse, DebugSessionInfo, ExtendQuery, TerminalCommand,
    TerminalMode,
};
pub use http_status::status_code;
pub use pipeline::{RunSummary, StepRunSummary, TriggerRunRequest, TriggerRunResponse};
pub use runner_ws::{BackendMessage, RunnerMessage, WsCloseCode};
