// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step control-plane HTTP wire types. These are the bodies
//! exchanged between the control layer running as PID 1 inside a step
//! container and the daemon's control-plane HTTP API.

use serde::{Deserialize, Serialize};

/// Written by the backend to `/workspace/.control/step_config.json` (0400
/// perms) before a container starts; read by the control layer on boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub step_id: String,
    pub execution_key: String,
    pub command: String,
    pub working_directory: String,
    pub environment: std::collections::BTreeMap<String, String>,
    pub timeout_seconds: u64,
    pub backend_url: String,
    pub auth_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatusKind {
    Running,
    Completed,
    Failed,
}

/// `POST /api/steps/{step_id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: StepStatusKind,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStreamWire {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLineWire {
    pub content: String,
    pub stream: LogStreamWire,
    pub timestamp: u64,
}

/// `POST /api/steps/{step_id}/logs`. The control layer batches lines (≥10
/// lines or ≥1s, 4) under `lines`; `content`/`stream` is a
/// single-line convenience form some callers use instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsRequest {
    #[serde(default)]
    pub lines: Option<Vec<LogLineWire>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub stream: Option<LogStreamWire>,
}

impl LogsRequest {
    /// Normalizes either wire shape into a flat line list.
    pub fn into_lines(self) -> Vec<LogLineWire> {
        if let Some(lines) = self.lines {
            return lines;
        }
        match (self.content, self.stream) {
            (Some(content), Some(stream)) => {
                vec![LogLineWire { content, stream, timestamp: 0 }]
            }
            _ => Vec::new(),
        }
    }
}

/// `POST /api/steps/{step_id}/heartbeat`, sent every `heartbeat_interval_s`
/// (default 10s) by the control layer's heartbeat task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub extend_seconds: Option<u64>,
    #[serde(default)]
    pub progress: Option<serde_json::Value>,
    pub timestamp: u64,
}

/// `GET /api/steps/{step_id}` response: the current execution snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub execution_id: String,
    pub status: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub progress: Option<serde_json::Value>,
    pub last_heartbeat_ms: Option<u64>,
    pub timeout_at_ms: Option<u64>,
}
