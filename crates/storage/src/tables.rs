// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table maps backing the in-process [`crate::gateway::PersistenceGateway`]:
//! a single `Arc<Mutex<MaterializedState>>` rather than an abstract DB
//! transaction trait — the right fit for the `Config::single_node` default.

use std::collections::HashMap;

use lazyaf_core::{
    DebugSession, DebugSessionId, ExecutionId, PipelineRun, Runner, RunnerId, RunId, StepExecution,
    StepRun, StepRunId, TriggerRecord, Workspace, WorkspaceId,
};

#[derive(Debug, Default)]
pub struct Tables {
    pub pipeline_runs: HashMap<RunId, PipelineRun>,
    pub step_runs: HashMap<StepRunId, StepRun>,
    /// `(pipeline_run_id, step_index)` -> ordered `StepRunId`s, for attempt numbering.
    pub step_runs_by_run_index: HashMap<(RunId, u32), StepRunId>,
    pub step_executions: HashMap<ExecutionId, StepExecution>,
    /// Dense per-`(run, step_index)` attempt list, in attempt order.
    pub executions_by_step_run: HashMap<StepRunId, Vec<ExecutionId>>,
    /// The idempotency index: `execution_key` -> `ExecutionId`.
    pub execution_by_key: HashMap<String, ExecutionId>,
    pub workspaces: HashMap<WorkspaceId, Workspace>,
    pub workspace_by_run: HashMap<RunId, WorkspaceId>,
    pub runners: HashMap<RunnerId, Runner>,
    pub debug_sessions: HashMap<DebugSessionId, DebugSession>,
    pub debug_session_by_run: HashMap<RunId, DebugSessionId>,
    pub triggers: HashMap<String, TriggerRecord>,
}
