// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DebugSession` and its FSM. `connection_mode` and the dual
//! `timeout_seconds`/`max_timeout_seconds` fields let a caller extend a
//! live attach without reopening the session.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ids::{DebugSessionId, RunId};
use crate::state_machine::StateTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugState {
    Pending,
    WaitingAtBreakpoint,
    Connected,
    Ended,
    Timeout,
}

crate::simple_display! {
    DebugState {
        Pending => "pending",
        WaitingAtBreakpoint => "waiting_at_bp",
        Connected => "connected",
        Ended => "ended",
        Timeout => "timeout",
    }
}

impl StateTable for DebugState {
    fn allowed_next(&self) -> &'static [Self] {
        use DebugState::*;
        match self {
            Pending => &[WaitingAtBreakpoint, Timeout, Ended],
            WaitingAtBreakpoint => &[Connected, Timeout, Ended],
            Connected => &[WaitingAtBreakpoint, Timeout, Ended],
            Ended | Timeout => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, DebugState::Ended | DebugState::Timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    Sidecar,
    Shell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSession {
    pub id: DebugSessionId,
    pub pipeline_run_id: RunId,
    pub original_run_id: Option<RunId>,
    pub status: DebugState,
    pub breakpoints: HashSet<u32>,
    pub current_step_index: Option<u32>,
    #[serde(skip_serializing)]
    pub token: String,
    pub connection_mode: Option<ConnectionMode>,
    pub sidecar_container_id: Option<String>,
    pub timeout_seconds: u64,
    pub max_timeout_seconds: u64,
    pub expires_at_ms: u64,
    pub created_at_ms: u64,
}

impl DebugSession {
    pub fn new(
        pipeline_run_id: RunId,
        original_run_id: Option<RunId>,
        breakpoints: HashSet<u32>,
        token: String,
        timeout_seconds: u64,
        max_timeout_seconds: u64,
        now_ms: u64,
    ) -> Self {
        Self {
            id: DebugSessionId::new(),
            pipeline_run_id,
            original_run_id,
            status: DebugState::Pending,
            breakpoints,
            current_step_index: None,
            token,
            connection_mode: None,
            sidecar_container_id: None,
            timeout_seconds,
            max_timeout_seconds,
            expires_at_ms: now_ms + timeout_seconds * 1000,
            created_at_ms: now_ms,
        }
    }

    pub fn has_breakpoint(&self, step_index: u32) -> bool {
        self.breakpoints.contains(&step_index)
    }

    /// `extend_timeout`, capped at `max_timeout_seconds` from `now_ms`.
    pub fn extend(&mut self, delta_seconds: u64, now_ms: u64) {
        let capped = self.max_timeout_seconds.min(
            (self.expires_at_ms.saturating_sub(now_ms) / 1000) + delta_seconds,
        );
        self.expires_at_ms = now_ms + capped * 1000;
    }
}

#[cfg(test)]
#[path = "debug_session_tests.rs"]
mod tests;
