// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Runner` and its connection-state FSM.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ExecutionId, RunnerId};
use crate::state_machine::StateTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    Disconnected,
    Connecting,
    Idle,
    Assigned,
    Busy,
    Dead,
}

crate::simple_display! {
    RunnerState {
        Disconnected => "disconnected",
        Connecting => "connecting",
        Idle => "idle",
        Assigned => "assigned",
        Busy => "busy",
        Dead => "dead",
    }
}

impl StateTable for RunnerState {
    fn allowed_next(&self) -> &'static [Self] {
        use RunnerState::*;
        match self {
            Disconnected => &[Connecting],
            Connecting => &[Idle, Disconnected],
            Idle => &[Assigned],
            Assigned => &[Busy, Dead, Disconnected],
            Busy => &[Idle, Dead, Disconnected],
            Dead => &[Connecting],
        }
    }

    fn is_terminal(&self) -> bool {
        // No RunnerState is structurally terminal; a DEAD runner can reconnect.
        false
    }
}

/// Runner type requested by a step, or a runner's own advertised type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerType {
    Any,
    ClaudeCode,
    Gemini,
    Generic(String),
}

impl RunnerType {
    /// Matching rule: `any` accepts everything; otherwise exact equality.
    pub fn matches(requested: &RunnerType, offered: &RunnerType) -> bool {
        matches!(requested, RunnerType::Any) || requested == offered
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    pub id: RunnerId,
    pub name: String,
    pub runner_type: RunnerType,
    pub labels: HashMap<String, String>,
    pub status: RunnerState,
    pub current_step_execution_id: Option<ExecutionId>,
    pub websocket_id: Option<String>,
    pub last_heartbeat_ms: Option<u64>,
    pub connected_at_ms: Option<u64>,
}

impl Runner {
    pub fn new(name: String, runner_type: RunnerType) -> Self {
        Self {
            id: RunnerId::new(),
            name,
            runner_type,
            labels: HashMap::new(),
            status: RunnerState::Disconnected,
            current_step_execution_id: None,
            websocket_id: None,
            last_heartbeat_ms: None,
            connected_at_ms: None,
        }
    }

    /// Invariant: `current_step_execution_id` is set iff the runner
    /// is `ASSIGNED` or `BUSY`.
    pub fn invariant_holds(&self) -> bool {
        let busy_like = matches!(self.status, RunnerState::Assigned | RunnerState::Busy);
        self.current_step_execution_id.is_some() == busy_like
    }

    pub fn satisfies(&self, requires_hardware: &[String]) -> bool {
        requires_hardware
            .iter()
            .all(|label| self.labels.contains_key(label))
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
