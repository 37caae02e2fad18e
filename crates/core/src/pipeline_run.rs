// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PipelineRun` and its status FSM.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ids::{PipelineId, RunId, StepId};
use crate::state_machine::StateTable;

/// Pipeline-run lifecycle status: linear happy path with
/// `FAILED`/`CANCELLED` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Pending,
    Preparing,
    Running,
    Completing,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    PipelineStatus {
        Pending => "pending",
        Preparing => "preparing",
        Running => "running",
        Completing => "completing",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl StateTable for PipelineStatus {
    fn allowed_next(&self) -> &'static [Self] {
        use PipelineStatus::*;
        match self {
            Pending => &[Preparing, Failed, Cancelled],
            Preparing => &[Running, Completed, Failed, Cancelled],
            Running => &[Completing, Failed, Cancelled],
            Completing => &[Completed, Failed, Cancelled],
            Completed | Failed | Cancelled => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Completed | PipelineStatus::Failed | PipelineStatus::Cancelled)
    }
}

/// How a pipeline run was started; carries the raw payload alongside the
/// type tag so dedup can inspect branch/status fields per trigger kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerType {
    Push { branches: Vec<String> },
    CardComplete { status: String },
    Manual,
}

/// One run of a [`crate::ids::PipelineId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub pipeline_id: PipelineId,
    pub status: PipelineStatus,
    pub trigger_type: TriggerType,
    pub trigger_context: serde_json::Value,
    pub active_step_ids: HashSet<StepId>,
    pub completed_step_ids: Vec<StepId>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub created_at_ms: u64,
}

impl PipelineRun {
    pub fn new(pipeline_id: PipelineId, trigger_type: TriggerType, created_at_ms: u64) -> Self {
        Self {
            id: RunId::new(),
            pipeline_id,
            status: PipelineStatus::Pending,
            trigger_type,
            trigger_context: serde_json::Value::Null,
            active_step_ids: HashSet::new(),
            completed_step_ids: Vec::new(),
            started_at_ms: None,
            completed_at_ms: None,
            created_at_ms,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_run_tests.rs"]
mod tests;
