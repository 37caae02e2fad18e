// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-pipeline-run orchestration task: walks the Pipeline Scheduler's DAG,
//! dispatching each ready step Local or Remote and reconciling on the
//! `StepRunStatus` event its completion broadcasts, the same event a
//! `lazyaf-engine::scheduler` edge application consumes independent of
//! which executor produced it.

use std::clone::Clone;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lazyaf_core::{
    Clock, EngineError, EngineResult, ErrorKind, Event, ExecutionId, Pipeline, PipelineId,
    PipelineStatus, RunId, RunnerType, StateMachine, StateTable, StepExecution, StepExecutionStatus,
    StepId, StepRun, StepType, TriggerType, Workspace,
};
use lazyaf_engine::{decide_route, on_step_completed, ready_successors, select_runner, RouteTarget};

use crate::context::EngineContext;

/// The `RunnerType` a step's definition demands of whoever picks it up.
pub(crate) fn requested_runner_type(step: &lazyaf_core::StepDef) -> RunnerType {
    match &step.step_type {
        StepType::Agent { runner_type, .. } if runner_type == "gemini" => RunnerType::Gemini,
        StepType::Agent { .. } => RunnerType::ClaudeCode,
        _ => RunnerType::Any,
    }
}

/// Transitions a `StepRun` to `status` and broadcasts `StepRunStatus`. The
/// `StepExecution` itself is finalized by whichever path observed the
/// terminal outcome first — the Local Executor inline, or the step-status
/// control-plane handler for a Remote execution.
pub fn finalize_step_run(
    ctx: &EngineContext,
    run_id: RunId,
    step_run_id: lazyaf_core::StepRunId,
    execution_id: ExecutionId,
    status: StepExecutionStatus,
    error: Option<String>,
) -> EngineResult<()> {
    let now = ctx.clock.epoch_ms();
    ctx.gateway.update_step_run(step_run_id, |sr| {
        sr.status = status;
        sr.error = error;
        sr.completed_at_ms = Some(now);
        Ok(())
    })?;
    ctx.events.broadcast(Event::StepRunStatus { run_id, step_run_id, execution_id, status });
    Ok(())
}

#[derive(Clone)]
pub struct RunDriver {
    ctx: Arc<EngineContext>,
}

impl RunDriver {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Default checkout branch for a freshly triggered run: the pushed
    /// branch for a `Push` trigger, `main` otherwise.
    pub(crate) fn default_branch(trigger_type: &TriggerType) -> String {
        match trigger_type {
            TriggerType::Push { branches } => branches.first().cloned().unwrap_or_else(|| "main".to_string()),
            _ => "main".to_string(),
        }
    }

    /// Starts a new run of `pipeline_id`, subject to trigger dedup keyed by
    /// `trigger_key`, and spawns its driver task. Returns the existing run
    /// id instead of starting a duplicate when `trigger_key` was recorded
    /// inside the dedup window.
    pub fn start_run(
        &self,
        pipeline_id: PipelineId,
        trigger_type: TriggerType,
        trigger_key: Option<String>,
        pin_commit: Option<String>,
    ) -> EngineResult<RunId> {
        let pipeline = self.ctx.pipelines.get(pipeline_id)?;
        let now = self.ctx.clock.epoch_ms();
        let run_id = RunId::new();

        if let Some(key) = trigger_key {
            if let Some(existing) =
                self.ctx.gateway.record_trigger_if_new(key, run_id, now, self.ctx.config.trigger_dedup_window_s)?
            {
                return Ok(existing);
            }
        }

        let mut run = lazyaf_core::PipelineRun::new(pipeline.id, trigger_type.clone(), now);
        run.id = run_id;
        self.ctx.gateway.insert_pipeline_run(run)?;

        let branch = Self::default_branch(&trigger_type);
        let driver = self.clone();
        tokio::spawn(async move {
            if let Err(e) = driver.drive(run_id, &pipeline, branch, pin_commit).await {
                tracing::error!(error = %e, %run_id, "pipeline run driver failed");
                let resolved = driver.ctx.gateway.update_pipeline_run(run_id, |r| {
                    if !r.status.is_terminal() {
                        r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Failed)?;
                    }
                    Ok(r.status)
                });
                if let Ok(status) = resolved {
                    driver.ctx.events.broadcast(Event::PipelineRunStatus { run_id, status });
                }
            }
        });

        Ok(run_id)
    }

    /// Spawns the driver task for a `PipelineRun` row a caller already
    /// inserted itself — the debug-rerun path, whose `DebugSessionService`
    /// owns creating the forked run so it can attach the session to it
    /// before anything is dispatched.
    pub fn resume_existing_run(&self, run_id: RunId, pipeline: Pipeline, branch: String, pin_commit: Option<String>) {
        let driver = self.clone();
        tokio::spawn(async move {
            if let Err(e) = driver.drive(run_id, &pipeline, branch, pin_commit).await {
                tracing::error!(error = %e, %run_id, "pipeline run driver failed");
                let resolved = driver.ctx.gateway.update_pipeline_run(run_id, |r| {
                    if !r.status.is_terminal() {
                        r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Failed)?;
                    }
                    Ok(r.status)
                });
                if let Ok(status) = resolved {
                    driver.ctx.events.broadcast(Event::PipelineRunStatus { run_id, status });
                }
            }
        });
    }

    async fn drive(&self, run_id: RunId, pipeline: &Pipeline, branch: String, pin_commit: Option<String>) -> EngineResult<()> {
        self.ctx.gateway.update_pipeline_run(run_id, |r| {
            r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Preparing)?;
            Ok(())
        })?;
        self.ctx.events.broadcast(Event::PipelineRunStatus { run_id, status: PipelineStatus::Preparing });

        let workspace = self.ctx.workspaces.create(run_id, pipeline.repo_id, branch, pin_commit).await?;

        let started_at = self.ctx.clock.epoch_ms();
        self.ctx.gateway.update_pipeline_run(run_id, |r| {
            r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Running)?;
            r.started_at_ms = Some(started_at);
            Ok(())
        })?;
        self.ctx.events.broadcast(Event::PipelineRunStatus { run_id, status: PipelineStatus::Running });

        let mut sub = self.ctx.events.subscribe();
        let mut completed: HashSet<StepId> = HashSet::new();
        let mut pending: HashMap<ExecutionId, StepId> = HashMap::new();
        let mut any_failed = false;

        for step_id in lazyaf_engine::scheduler::start_run(pipeline) {
            self.dispatch(run_id, pipeline, &workspace, step_id, &mut pending).await?;
        }

        while !pending.is_empty() {
            let Some(delivery) = sub.recv().await else { break };
            let lazyaf_engine::Delivery::Event(Event::StepRunStatus { run_id: event_run, execution_id, status, .. }) = delivery else {
                continue;
            };
            if event_run != run_id || !status.is_terminal() {
                continue;
            }
            let Some(step_id) = pending.remove(&execution_id) else { continue };

            completed.insert(step_id);
            let succeeded = status == StepExecutionStatus::Completed;
            any_failed |= !succeeded;

            let outcome = on_step_completed(pipeline, run_id, workspace.id, step_id, succeeded);
            for effect in outcome.effects {
                self.apply_effect(pipeline, effect).await;
            }

            for next in ready_successors(pipeline, &completed, &outcome.next_steps) {
                self.dispatch(run_id, pipeline, &workspace, next, &mut pending).await?;
            }
        }

        let final_status = if any_failed { PipelineStatus::Failed } else { PipelineStatus::Completed };
        let completed_at = self.ctx.clock.epoch_ms();
        let resolved_status = self.ctx.gateway.update_pipeline_run(run_id, |r| {
            r.completed_step_ids = completed.into_iter().collect();
            // A concurrent abort (e.g. a debug session cancel) may already have
            // driven this run to a terminal status while the loop above was
            // still draining in-flight executions; don't clobber it.
            if !r.status.is_terminal() {
                if final_status == PipelineStatus::Completed {
                    r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Completing)?;
                    r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Completed)?;
                } else {
                    r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Failed)?;
                }
                r.completed_at_ms = Some(completed_at);
            }
            Ok(r.status)
        })?;
        self.ctx.events.broadcast(Event::PipelineRunStatus { run_id, status: resolved_status });

        let debug_still_open = self
            .ctx
            .gateway
            .get_debug_session_for_run(run_id)?
            .is_some_and(|s| !s.status.is_terminal());
        if !debug_still_open {
            let _ = self.ctx.workspaces.cleanup(workspace.id).await;
        }

        Ok(())
    }

    async fn apply_effect(&self, pipeline: &Pipeline, effect: lazyaf_core::Effect) {
        match effect {
            lazyaf_core::Effect::TriggerSubrun { step_id, .. } => {
                let Some(step) = pipeline.step(step_id) else { return };
                let mut solo_step = step.clone();
                solo_step.successors.clear();
                let sub_pipeline = Pipeline::new(PipelineId::new(), pipeline.repo_id, vec![solo_step], Vec::new());
                let sub_id = sub_pipeline.id;
                if self.ctx.pipelines.register(sub_pipeline).is_ok() {
                    if let Err(e) = self.start_run(sub_id, TriggerType::Manual, None, None) {
                        tracing::warn!(error = %e, step_id = %step_id, "failed to start triggered subrun");
                    }
                }
            }
            lazyaf_core::Effect::FastForwardBranch { workspace_id, branch } => {
                if let Ok(ws) = self.ctx.gateway.get_workspace(workspace_id) {
                    if let Err(e) = self.ctx.git.fast_forward(&ws.volume_name, &branch).await {
                        tracing::warn!(error = %e, %workspace_id, %branch, "fast-forward merge failed");
                    }
                }
            }
            _ => {}
        }
    }

    async fn dispatch(
        &self,
        run_id: RunId,
        pipeline: &Pipeline,
        workspace: &Workspace,
        step_id: StepId,
        pending: &mut HashMap<ExecutionId, StepId>,
    ) -> EngineResult<()> {
        let step = pipeline
            .step(step_id)
            .ok_or_else(|| EngineError::fatal(format!("run {run_id}: unknown step {step_id}")))?
            .clone();
        let step_index = pipeline.steps.iter().position(|s| s.step_id == step_id).unwrap_or(0) as u32;

        let step_run = StepRun::new(run_id, step_id, step_index, step.name.clone());
        let step_run_id = self.ctx.gateway.insert_step_run(step_run)?;
        let now = self.ctx.clock.epoch_ms();
        let (execution, _claimed) = self.ctx.gateway.claim_execution(run_id, step_index, step_run_id, 1, now)?;
        let execution_id = execution.id;
        pending.insert(execution_id, step_id);

        if self.ctx.debug.check_breakpoint(run_id, step_index).await? {
            finalize_step_run(
                &self.ctx,
                run_id,
                step_run_id,
                execution_id,
                StepExecutionStatus::Cancelled,
                Some("aborted from debug session".to_string()),
            )?;
            return Ok(());
        }

        let timeout_seconds = step.timeout_seconds.unwrap_or(self.ctx.config.default_step_timeout_s);
        let route = decide_route(&step, self.ctx.config.use_local_executor, false, self.ctx.config.force_remote);

        match route.target {
            RouteTarget::Local => {
                let ctx = self.ctx.clone();
                let step = step.clone();
                let workspace = workspace.clone();
                tokio::spawn(async move {
                    let result = ctx
                        .local_executor
                        .execute(run_id, step_run_id, execution_id, &step, &workspace, timeout_seconds)
                        .await;
                    let (status, error) = match result {
                        Ok(exit_code) => (StepExecution::outcome_status(exit_code), None),
                        Err(e) if e.kind() == ErrorKind::Timeout => (StepExecutionStatus::Timeout, Some(e.message().to_string())),
                        Err(e) => (StepExecutionStatus::Failed, Some(e.message().to_string())),
                    };
                    let _ = finalize_step_run(&ctx, run_id, step_run_id, execution_id, status, error);
                });
            }
            RouteTarget::Remote => {
                let requested_type = requested_runner_type(&step);
                let runners = self.ctx.gateway.list_runners();
                let Some(runner) = select_runner(&runners, &requested_type, &step.requires, None) else {
                    finalize_step_run(
                        &self.ctx,
                        run_id,
                        step_run_id,
                        execution_id,
                        StepExecutionStatus::Failed,
                        Some("no runner available".to_string()),
                    )?;
                    return Ok(());
                };
                let runner_id = runner.id;
                let token = self.ctx.tokens.mint(step.step_id, now, lazyaf_engine::DEFAULT_TTL_SECONDS);
                let step_config = serde_json::json!({
                    "step": step,
                    "token": token,
                    "workspace_volume": workspace.volume_name,
                });
                self.ctx.gateway.update_step_execution(execution_id, |e| {
                    e.runner_id = Some(runner_id);
                    Ok(())
                })?;
                self.ctx
                    .runners
                    .assign(runner_id, execution_id, step.step_id.as_str(), &execution.execution_key, step_config)
                    .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "run_driver_tests.rs"]
pub(crate) mod tests;
