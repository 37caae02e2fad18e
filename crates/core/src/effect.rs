// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instructions emitted by the pure Scheduler/Router reducers and
//! carried out by an executor loop in `lazyaf-daemon`. Keeping the scheduler
//! an `Effect`-returning pure function (rather than performing I/O itself)
//! is what makes it unit-testable without spinning up containers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::ids::{DebugSessionId, ExecutionId, RepositoryId, RunId, StepId, StepRunId, WorkspaceId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    EmitEvent(Event),

    CreateWorkspace { run_id: RunId, repo_id: RepositoryId, branch: String },
    AcquireLease { workspace_id: WorkspaceId, holder: String },
    ReleaseLease { workspace_id: WorkspaceId, holder: String },
    CleanupWorkspace { workspace_id: WorkspaceId },

    DispatchLocal { execution_id: ExecutionId, step_run_id: StepRunId },
    DispatchRemote { execution_id: ExecutionId, step_run_id: StepRunId },
    KillExecution { execution_id: ExecutionId },

    SetTimer {
        timer_id: String,
        #[serde(with = "duration_millis")]
        delay: Duration,
    },
    CancelTimer { timer_id: String },

    PauseAtBreakpoint { session_id: DebugSessionId, step_index: u32 },

    TriggerSubrun { from_run_id: RunId, step_id: StepId },
    FastForwardBranch { workspace_id: WorkspaceId, branch: String },
}

impl Effect {
    /// Stable discriminator for structured logging (`tracing` span fields).
    pub fn name(&self) -> &'static str {
        match self {
            Effect::EmitEvent(_) => "emit_event",
            Effect::CreateWorkspace { .. } => "create_workspace",
            Effect::AcquireLease { .. } => "acquire_lease",
            Effect::ReleaseLease { .. } => "release_lease",
            Effect::CleanupWorkspace { .. } => "cleanup_workspace",
            Effect::DispatchLocal { .. } => "dispatch_local",
            Effect::DispatchRemote { .. } => "dispatch_remote",
            Effect::KillExecution { .. } => "kill_execution",
            Effect::SetTimer { .. } => "set_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::PauseAtBreakpoint { .. } => "pause_at_breakpoint",
            Effect::TriggerSubrun { .. } => "trigger_subrun",
            Effect::FastForwardBranch { .. } => "fast_forward_branch",
        }
    }

    /// Key-value pairs suitable for a `tracing` span, without materializing
    /// the whole payload (e.g. log lines) into the log line itself.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::CreateWorkspace { run_id, branch, .. } => {
                vec![("run_id", run_id.to_string()), ("branch", branch.clone())]
            }
            Effect::DispatchLocal { execution_id, .. }
            | Effect::DispatchRemote { execution_id, .. }
            | Effect::KillExecution { execution_id } => {
                vec![("execution_id", execution_id.to_string())]
            }
            Effect::AcquireLease { workspace_id, .. }
            | Effect::ReleaseLease { workspace_id, .. }
            | Effect::CleanupWorkspace { workspace_id } => {
                vec![("workspace_id", workspace_id.to_string())]
            }
            Effect::SetTimer { timer_id, delay } => {
                vec![("timer_id", timer_id.clone()), ("delay_ms", delay.as_millis().to_string())]
            }
            Effect::CancelTimer { timer_id } => vec![("timer_id", timer_id.clone())],
            Effect::PauseAtBreakpoint { session_id, step_index } => {
                vec![("session_id", session_id.to_string()), ("step_index", step_index.to_string())]
            }
            Effect::TriggerSubrun { from_run_id, step_id } => {
                vec![("from_run_id", from_run_id.to_string()), ("step_id", step_id.to_string())]
            }
            Effect::FastForwardBranch { workspace_id, branch } => {
                vec![("workspace_id", workspace_id.to_string()), ("branch", branch.clone())]
            }
            Effect::EmitEvent(_) => vec![],
        }
    }
}

/// Serializes a `Duration` as integer milliseconds for wire-friendly timers.
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(delay.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
