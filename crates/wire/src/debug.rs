// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debug session HTTP/terminal wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRerunRequest {
    pub breakpoints: Vec<u32>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// `POST /api/pipeline-runs/{run_id}/debug-rerun` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRerunResponse {
    pub run_id: String,
    pub debug_session_id: String,
    pub token: String,
}

/// `GET /api/debug/{session_id}` response. Omits the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSessionInfo {
    pub session_id: String,
    pub pipeline_run_id: String,
    pub status: String,
    pub breakpoints: Vec<u32>,
    pub current_step_index: Option<u32>,
    pub connection_mode: Option<String>,
    pub expires_at_ms: u64,
}

/// Query string for `POST /api/debug/{session_id}/extend?additional_minutes=1..180`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendQuery {
    pub additional_minutes: u32,
}

/// `WS /api/debug/{session_id}/terminal?mode=sidecar|shell` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalMode {
    Sidecar,
    Shell,
}

/// Special in-band commands recognized inside a terminal attach stream
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCommand {
    Resume,
    Abort,
    Status,
    Help,
}

impl TerminalCommand {
    /// Parses a line of raw terminal input for an in-band command. Returns
    /// `None` for anything that should instead be forwarded as keystrokes.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "@resume" => Some(Self::Resume),
            "@abort" => Some(Self::Abort),
            "@status" => Some(Self::Status),
            "@help" => Some(Self::Help),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
