// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PersistenceGateway`: typed CRUD + the idempotency/optimistic-update
//! primitives the rest of the engine is built on.

use std::sync::Arc;

use lazyaf_core::{
    make_execution_key, DebugSession, DebugSessionId, EngineError, EngineResult, ExecutionId,
    PipelineRun, Runner, RunnerId, RunId, StateMachine, StateTable, StepExecution,
    StepExecutionStatus, StepRun, StepRunId, TriggerRecord, Workspace, WorkspaceId,
    WorkspaceStatus,
};
use parking_lot::Mutex;

use crate::tables::Tables;

/// Checks `current` is one of `allowed_from` before attempting the
/// structural FSM transition. Distinct
/// from [`StateMachine::transition_to`]'s structural check: this additionally
/// rejects a transition attempted from an unexpected (but structurally
/// reachable) prior state, catching a concurrent actor having already moved it.
pub fn update_if_status_in<S: StateTable>(current: S, allowed_from: &[S], new: S) -> EngineResult<S> {
    if current == new {
        return Ok(current);
    }
    if !allowed_from.contains(&current) {
        return Err(EngineError::conflict(format!(
            "expected status in {allowed_from:?}, found {current:?}"
        )));
    }
    StateMachine::new(current).transition_to(new)
}

#[derive(Clone, Default)]
pub struct PersistenceGateway {
    inner: Arc<Mutex<Tables>>,
}

impl PersistenceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a single lock acquisition. Nested conceptual
    /// transactions flatten into this one outer lock, matching 's
    /// "supports nested conceptual transactions by flattening" contract.
    pub fn atomic<T>(&self, f: impl FnOnce(&mut Tables) -> EngineResult<T>) -> EngineResult<T> {
        let mut tables = self.inner.lock();
        f(&mut tables)
    }

    // ---- PipelineRun ----------------------------------------------------

    pub fn insert_pipeline_run(&self, run: PipelineRun) -> EngineResult<()> {
        self.atomic(|t| {
            t.pipeline_runs.insert(run.id, run);
            Ok(())
        })
    }

    pub fn get_pipeline_run(&self, id: RunId) -> EngineResult<PipelineRun> {
        self.atomic(|t| {
            t.pipeline_runs
                .get(&id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("pipeline run {id} not found")))
        })
    }

    pub fn update_pipeline_run<T>(
        &self,
        id: RunId,
        f: impl FnOnce(&mut PipelineRun) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.atomic(|t| {
            let run = t
                .pipeline_runs
                .get_mut(&id)
                .ok_or_else(|| EngineError::not_found(format!("pipeline run {id} not found")))?;
            f(run)
        })
    }

    // ---- StepRun ----------------------------------------------------------

    pub fn insert_step_run(&self, step_run: StepRun) -> EngineResult<StepRunId> {
        self.atomic(|t| {
            let id = step_run.id;
            t.step_runs_by_run_index
                .insert((step_run.pipeline_run_id, step_run.step_index), id);
            t.step_runs.insert(id, step_run);
            Ok(id)
        })
    }

    pub fn get_step_run(&self, id: StepRunId) -> EngineResult<StepRun> {
        self.atomic(|t| {
            t.step_runs
                .get(&id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("step run {id} not found")))
        })
    }

    pub fn update_step_run<T>(
        &self,
        id: StepRunId,
        f: impl FnOnce(&mut StepRun) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.atomic(|t| {
            let step_run = t
                .step_runs
                .get_mut(&id)
                .ok_or_else(|| EngineError::not_found(format!("step run {id} not found")))?;
            f(step_run)
        })
    }

    pub fn step_runs_for_run(&self, run_id: RunId) -> Vec<StepRun> {
        self.atomic(|t| {
            Ok(t.step_runs.values().filter(|s| s.pipeline_run_id == run_id).cloned().collect())
        })
        .unwrap_or_default()
    }

    // ---- StepExecution / idempotency --------------------------------------

    /// All attempts recorded for `step_run_id`, oldest first.
    pub fn executions_for_step_run(&self, step_run_id: StepRunId) -> Vec<StepExecution> {
        self.atomic(|t| {
            Ok(t.executions_by_step_run
                .get(&step_run_id)
                .map(|ids| ids.iter().filter_map(|id| t.step_executions.get(id).cloned()).collect())
                .unwrap_or_default())
        })
        .unwrap_or_default()
    }

    /// Next 1-based attempt number for `(run, step_index)`: `1 + max(existing attempts)`.
    pub fn next_attempt(&self, step_run_id: StepRunId) -> u32 {
        self.atomic(|t| {
            Ok(t.executions_by_step_run.get(&step_run_id).map(|v| v.len() as u32).unwrap_or(0) + 1)
        })
        .unwrap_or(1)
    }

    /// `claim_execution(execution_key) -> (execution, claimed)`: an upsert-on-unique-key that returns `claimed = true` only for
    /// the caller that performs the first insert. Concurrent callers with
    /// the same key observe the same row and `claimed = false`.
    pub fn claim_execution(
        &self,
        run_id: RunId,
        step_index: u32,
        step_run_id: StepRunId,
        attempt: u32,
        now_ms: u64,
    ) -> EngineResult<(StepExecution, bool)> {
        let key = make_execution_key(&run_id, step_index, attempt);
        self.atomic(|t| {
            if let Some(existing_id) = t.execution_by_key.get(&key) {
                let existing = t.step_executions.get(existing_id).cloned().ok_or_else(|| {
                    EngineError::fatal(format!("execution_by_key index out of sync for key {key}"))
                })?;
                return Ok((existing, false));
            }
            let execution = StepExecution::new(step_run_id, key.clone(), now_ms);
            t.execution_by_key.insert(key, execution.id);
            t.executions_by_step_run.entry(step_run_id).or_default().push(execution.id);
            t.step_executions.insert(execution.id, execution.clone());
            Ok((execution, true))
        })
    }

    pub fn get_step_execution(&self, id: ExecutionId) -> EngineResult<StepExecution> {
        self.atomic(|t| {
            t.step_executions
                .get(&id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("execution {id} not found")))
        })
    }

    pub fn get_execution_by_key(&self, execution_key: &str) -> EngineResult<StepExecution> {
        self.atomic(|t| {
            let id = t
                .execution_by_key
                .get(execution_key)
                .copied()
                .ok_or_else(|| EngineError::not_found(format!("no execution for key {execution_key}")))?;
            t.step_executions
                .get(&id)
                .cloned()
                .ok_or_else(|| EngineError::fatal(format!("execution_by_key index out of sync for id {id}")))
        })
    }

    pub fn update_step_execution<T>(
        &self,
        id: ExecutionId,
        f: impl FnOnce(&mut StepExecution) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.atomic(|t| {
            let exec = t
                .step_executions
                .get_mut(&id)
                .ok_or_else(|| EngineError::not_found(format!("execution {id} not found")))?;
            f(exec)
        })
    }

    /// Applies an `update_if_status_in` transition to a `StepExecution`,
    /// absorbing the laws: writing the same terminal
    /// status with the same `exit_code` twice is a no-op; an inconsistent
    /// terminal write returns `Conflict` without mutating the record.
    pub fn transition_step_execution(
        &self,
        id: ExecutionId,
        allowed_from: &[StepExecutionStatus],
        new: StepExecutionStatus,
        exit_code: Option<i32>,
        error: Option<String>,
        now_ms: u64,
    ) -> EngineResult<StepExecution> {
        self.update_step_execution(id, |exec| {
            if exec.status == new && exec.status.is_terminal() {
                if exec.exit_code == exit_code {
                    return Ok(exec.clone());
                }
                return Err(EngineError::conflict(format!(
                    "inconsistent terminal rewrite: execution {id} already {new:?} with exit_code {:?}, got {exit_code:?}",
                    exec.exit_code
                )));
            }
            exec.status = update_if_status_in(exec.status, allowed_from, new)?;
            if exit_code.is_some() {
                exec.exit_code = exit_code;
            }
            if error.is_some() {
                exec.error = error;
            }
            if exec.started_at_ms.is_none() && matches!(new, StepExecutionStatus::Running) {
                exec.started_at_ms = Some(now_ms);
            }
            if new.is_terminal() {
                exec.completed_at_ms = Some(now_ms);
            }
            Ok(exec.clone())
        })
    }

    /// All StepExecutions in a non-terminal status (the orphan recovery scan).
    pub fn non_terminal_executions(&self) -> Vec<StepExecution> {
        self.atomic(|t| {
            Ok(t.step_executions.values().filter(|e| !e.status.is_terminal()).cloned().collect())
        })
        .unwrap_or_default()
    }

    /// Terminal executions whose `completed_at_ms` predates `cutoff_ms`
    ///.
    pub fn terminal_executions_older_than(&self, cutoff_ms: u64) -> Vec<ExecutionId> {
        self.atomic(|t| {
            Ok(t.step_executions
                .values()
                .filter(|e| e.status.is_terminal() && e.completed_at_ms.is_some_and(|c| c < cutoff_ms))
                .map(|e| e.id)
                .collect())
        })
        .unwrap_or_default()
    }

    pub fn delete_execution(&self, id: ExecutionId) {
        let _ = self.atomic(|t| {
            if let Some(exec) = t.step_executions.remove(&id) {
                t.execution_by_key.remove(&exec.execution_key);
            }
            Ok(())
        });
    }

    // ---- Workspace ----------------------------------------------------------

    pub fn insert_workspace(&self, workspace: Workspace) -> EngineResult<()> {
        self.atomic(|t| {
            t.workspace_by_run.insert(workspace.pipeline_run_id, workspace.id);
            t.workspaces.insert(workspace.id, workspace);
            Ok(())
        })
    }

    pub fn get_workspace(&self, id: WorkspaceId) -> EngineResult<Workspace> {
        self.atomic(|t| {
            t.workspaces.get(&id).cloned().ok_or_else(|| EngineError::not_found(format!("workspace {id} not found")))
        })
    }

    pub fn get_workspace_for_run(&self, run_id: RunId) -> EngineResult<Workspace> {
        self.atomic(|t| {
            let id = t
                .workspace_by_run
                .get(&run_id)
                .copied()
                .ok_or_else(|| EngineError::not_found(format!("no workspace for run {run_id}")))?;
            t.workspaces
                .get(&id)
                .cloned()
                .ok_or_else(|| EngineError::fatal(format!("workspace_by_run index out of sync for id {id}")))
        })
    }

    pub fn update_workspace<T>(
        &self,
        id: WorkspaceId,
        f: impl FnOnce(&mut Workspace) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.atomic(|t| {
            let ws = t.workspaces.get_mut(&id).ok_or_else(|| EngineError::not_found(format!("workspace {id} not found")))?;
            f(ws)
        })
    }

    /// Increments `use_count` and transitions `READY -> IN_USE` if needed
    ///. Errors if the workspace isn't `READY`/`IN_USE`.
    pub fn acquire_lease(&self, id: WorkspaceId, now_ms: u64) -> EngineResult<Workspace> {
        self.update_workspace(id, |ws| {
            match ws.status {
                WorkspaceStatus::Ready => {
                    ws.status = WorkspaceStatus::InUse;
                }
                WorkspaceStatus::InUse => {}
                other => {
                    return Err(EngineError::conflict(format!(
                        "cannot acquire lease on workspace in state {other:?}"
                    )))
                }
            }
            ws.use_count += 1;
            ws.last_activity_at_ms = now_ms;
            Ok(ws.clone())
        })
    }

    /// Decrements `use_count`; transitions `IN_USE -> READY` once it hits zero.
    pub fn release_lease(&self, id: WorkspaceId, now_ms: u64) -> EngineResult<Workspace> {
        self.update_workspace(id, |ws| {
            ws.use_count = ws.use_count.saturating_sub(1);
            ws.last_activity_at_ms = now_ms;
            if ws.use_count == 0 && ws.status == WorkspaceStatus::InUse {
                ws.status = WorkspaceStatus::Ready;
            }
            Ok(ws.clone())
        })
    }

    pub fn transition_workspace(
        &self,
        id: WorkspaceId,
        allowed_from: &[WorkspaceStatus],
        new: WorkspaceStatus,
    ) -> EngineResult<Workspace> {
        self.update_workspace(id, |ws| {
            if new == WorkspaceStatus::Cleaning && ws.use_count > 0 {
                return Err(EngineError::conflict(format!(
                    "cannot enter CLEANING with use_count={}",
                    ws.use_count
                )));
            }
            ws.status = update_if_status_in(ws.status, allowed_from, new)?;
            Ok(ws.clone())
        })
    }

    /// Workspaces owned by a terminal pipeline whose `last_activity_at_ms`
    /// exceeds `grace_ms`.
    pub fn workspaces_eligible_for_gc(&self, now_ms: u64, grace_ms: u64) -> Vec<WorkspaceId> {
        self.atomic(|t| {
            Ok(t.workspaces
                .values()
                .filter(|ws| {
                    !matches!(ws.status, WorkspaceStatus::Cleaned | WorkspaceStatus::Cleaning)
                        && now_ms.saturating_sub(ws.last_activity_at_ms) > grace_ms
                        && t.pipeline_runs
                            .get(&ws.pipeline_run_id)
                            .is_none_or(|r| r.status.is_terminal())
                })
                .map(|ws| ws.id)
                .collect())
        })
        .unwrap_or_default()
    }

    // ---- Runner ----------------------------------------------------------

    pub fn upsert_runner(&self, runner: Runner) -> EngineResult<()> {
        self.atomic(|t| {
            t.runners.insert(runner.id, runner);
            Ok(())
        })
    }

    pub fn get_runner(&self, id: RunnerId) -> EngineResult<Runner> {
        self.atomic(|t| t.runners.get(&id).cloned().ok_or_else(|| EngineError::not_found(format!("runner {id} not found"))))
    }

    pub fn update_runner<T>(&self, id: RunnerId, f: impl FnOnce(&mut Runner) -> EngineResult<T>) -> EngineResult<T> {
        self.atomic(|t| {
            let runner = t.runners.get_mut(&id).ok_or_else(|| EngineError::not_found(format!("runner {id} not found")))?;
            f(runner)
        })
    }

    pub fn list_runners(&self) -> Vec<Runner> {
        self.atomic(|t| Ok(t.runners.values().cloned().collect())).unwrap_or_default()
    }

    /// Runners whose `last_heartbeat_ms` predates `cutoff_ms` and aren't
    /// already `DEAD`.
    pub fn runners_past_heartbeat(&self, cutoff_ms: u64) -> Vec<RunnerId> {
        self.atomic(|t| {
            Ok(t.runners
                .values()
                .filter(|r| {
                    r.status != lazyaf_core::RunnerState::Dead
                        && r.status != lazyaf_core::RunnerState::Disconnected
                        && r.last_heartbeat_ms.is_none_or(|hb| hb < cutoff_ms)
                })
                .map(|r| r.id)
                .collect())
        })
        .unwrap_or_default()
    }

    // ---- DebugSession ------------------------------------------------------

    pub fn insert_debug_session(&self, session: DebugSession) -> EngineResult<()> {
        self.atomic(|t| {
            if t.debug_session_by_run.contains_key(&session.pipeline_run_id) {
                return Err(EngineError::conflict(format!(
                    "pipeline run {} already has an active debug session",
                    session.pipeline_run_id
                )));
            }
            t.debug_session_by_run.insert(session.pipeline_run_id, session.id);
            t.debug_sessions.insert(session.id, session);
            Ok(())
        })
    }

    pub fn get_debug_session(&self, id: DebugSessionId) -> EngineResult<DebugSession> {
        self.atomic(|t| {
            t.debug_sessions.get(&id).cloned().ok_or_else(|| EngineError::not_found(format!("debug session {id} not found")))
        })
    }

    pub fn get_debug_session_for_run(&self, run_id: RunId) -> EngineResult<Option<DebugSession>> {
        self.atomic(|t| {
            Ok(t.debug_session_by_run.get(&run_id).and_then(|id| t.debug_sessions.get(id)).cloned())
        })
    }

    pub fn update_debug_session<T>(
        &self,
        id: DebugSessionId,
        f: impl FnOnce(&mut DebugSession) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.atomic(|t| {
            let session = t
                .debug_sessions
                .get_mut(&id)
                .ok_or_else(|| EngineError::not_found(format!("debug session {id} not found")))?;
            f(session)
        })
    }

    pub fn active_debug_sessions(&self) -> Vec<DebugSession> {
        self.atomic(|t| Ok(t.debug_sessions.values().filter(|s| !s.status.is_terminal()).cloned().collect()))
            .unwrap_or_default()
    }

    // ---- Trigger dedup ------------------------------------------------------

    /// Atomically checks-and-records a trigger. Returns `Ok(None)` when newly recorded, `Ok(Some(existing))`
    /// when a non-expired record for `key` already exists.
    pub fn record_trigger_if_new(
        &self,
        key: String,
        pipeline_run_id: RunId,
        now_ms: u64,
        dedup_window_s: u64,
    ) -> EngineResult<Option<RunId>> {
        self.atomic(|t| {
            if let Some(existing) = t.triggers.get(&key) {
                if existing.is_duplicate(now_ms, dedup_window_s) {
                    return Ok(Some(existing.pipeline_run_id));
                }
            }
            t.triggers.insert(key.clone(), TriggerRecord::new(key, pipeline_run_id, now_ms));
            Ok(None)
        })
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
