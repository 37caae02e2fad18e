// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `StepRun`: one per step of a pipeline run. Its visible `status`
//! mirrors the status of its current (latest) `StepExecution`.

use serde::{Deserialize, Serialize};

use crate::ids::{RunId, StepId, StepRunId};
use crate::step_execution::StepExecutionStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRun {
    pub id: StepRunId,
    pub pipeline_run_id: RunId,
    pub step_id: StepId,
    pub step_index: u32,
    pub name: String,
    pub status: StepExecutionStatus,
    pub logs: Vec<LogLine>,
    pub error: Option<String>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub content: String,
    pub stream: LogStream,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl StepRun {
    pub fn new(pipeline_run_id: RunId, step_id: StepId, step_index: u32, name: String) -> Self {
        Self {
            id: StepRunId::new(),
            pipeline_run_id,
            step_id,
            step_index,
            name,
            status: StepExecutionStatus::Pending,
            logs: Vec::new(),
            error: None,
            started_at_ms: None,
            completed_at_ms: None,
        }
    }

    /// Appends log lines in arrival order; cross-stream interleaving is not
    /// sequenced.
    pub fn append_logs(&mut self, lines: impl IntoIterator<Item = LogLine>) {
        self.logs.extend(lines);
    }
}

#[cfg(test)]
#[path = "step_run_tests.rs"]
mod tests;
