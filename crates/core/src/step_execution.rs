// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `StepExecution`: one attempt of a `StepRun`, and its status FSM,
//! transcribed 1:1 from `state_machine.py`'s `StepExecutionStatus` /
//! `VALID_TRANSITIONS`.

use serde::{Deserialize, Serialize};

use crate::ids::{ExecutionId, RunId, RunnerId, StepRunId};
use crate::state_machine::StateTable;

/// Status of one StepExecution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepExecutionStatus {
    Pending,
    Assigned,
    Preparing,
    Running,
    Completing,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

crate::simple_display! {
    StepExecutionStatus {
        Pending => "pending",
        Assigned => "assigned",
        Preparing => "preparing",
        Running => "running",
        Completing => "completing",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Timeout => "timeout",
    }
}

impl StateTable for StepExecutionStatus {
    fn allowed_next(&self) -> &'static [Self] {
        use StepExecutionStatus::*;
        match self {
            Pending => &[Assigned, Cancelled, Failed],
            Assigned => &[Preparing, Cancelled, Failed],
            Preparing => &[Running, Cancelled, Failed],
            Running => &[Completing, Cancelled, Failed, Timeout],
            Completing => &[Completed, Cancelled, Failed],
            Completed | Failed | Cancelled | Timeout => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepExecutionStatus::Completed
                | StepExecutionStatus::Failed
                | StepExecutionStatus::Cancelled
                | StepExecutionStatus::Timeout
        )
    }
}

/// Builds the idempotency key `"{pipeline_run_id}:{step_index}:{attempt}"`.
pub fn make_execution_key(run_id: &RunId, step_index: u32, attempt: u32) -> String {
    format!("{run_id}:{step_index}:{attempt}")
}

/// One attempt of a `StepRun`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: ExecutionId,
    pub execution_key: String,
    pub step_run_id: StepRunId,
    pub status: StepExecutionStatus,
    pub runner_id: Option<RunnerId>,
    pub container_id: Option<String>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub progress: Option<serde_json::Value>,
    pub last_heartbeat_ms: Option<u64>,
    pub timeout_at_ms: Option<u64>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub created_at_ms: u64,
}

impl StepExecution {
    pub fn new(
        step_run_id: StepRunId,
        execution_key: String,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            execution_key,
            step_run_id,
            status: StepExecutionStatus::Pending,
            runner_id: None,
            container_id: None,
            exit_code: None,
            error: None,
            progress: None,
            last_heartbeat_ms: None,
            timeout_at_ms: None,
            started_at_ms: None,
            completed_at_ms: None,
            created_at_ms,
        }
    }

    /// Terminal status is `Completed` iff `exit_code == 0`, else `Failed`.
    pub fn outcome_status(exit_code: i32) -> StepExecutionStatus {
        if exit_code == 0 {
            StepExecutionStatus::Completed
        } else {
            StepExecutionStatus::Failed
        }
    }
}

#[cfg(test)]
#[path = "step_execution_tests.rs"]
mod tests;
