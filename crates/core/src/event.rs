// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Event` vocabulary broadcast over the Event Bus and
//! appended to the write-ahead log. Mirrors //! `#[serde(tag = "type")]` idiom so wire frames carry an explicit discriminator.

use serde::{Deserialize, Serialize};

use crate::debug_session::DebugState;
use crate::ids::{DebugSessionId, ExecutionId, RunId, RunnerId, StepRunId};
use crate::pipeline_run::PipelineStatus;
use crate::runner::RunnerState;
use crate::step_execution::StepExecutionStatus;
use crate::step_run::LogLine;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A UI-facing "card" (pipeline run summary) changed.
    CardUpdated { pipeline_run_id: RunId },
    /// Opaque backend-job status change (carried through from the CRUD layer).
    JobStatus { job_id: String, status: String },
    PipelineRunStatus { run_id: RunId, status: PipelineStatus },
    StepRunStatus {
        run_id: RunId,
        step_run_id: StepRunId,
        execution_id: ExecutionId,
        status: StepExecutionStatus,
    },
    StepLogs { step_run_id: StepRunId, lines: Vec<LogLine> },
    RunnerStatus { runner_id: RunnerId, status: RunnerState },
    DebugEvent {
        session_id: DebugSessionId,
        status: DebugState,
        kind: DebugEventKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugEventKind {
    BreakpointHit,
    Resumed,
    Aborted,
    TimedOut,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
