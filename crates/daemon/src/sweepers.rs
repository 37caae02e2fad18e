// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background periodic tasks: reconciling state no single request owns.
//! Each sweep composes [`EngineContext`]'s collaborators directly the same
//! way [`crate::run_driver`] does, rather than going through the HTTP
//! surface — these are maintenance loops, not client-facing operations.

use std::sync::Arc;
use std::time::Duration;

use lazyaf_core::{Clock, ExecutionId, PipelineStatus, StateMachine, StepDef, Workspace};
use lazyaf_engine::{select_runner, OrphanRecoverySweeper};

use crate::context::EngineContext;
use crate::run_driver::requested_runner_type;

const ACK_SWEEP_INTERVAL: Duration = Duration::from_secs(5);
const ORPHAN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEBUG_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Reconciles runners that never ack'd a dispatch or stopped heartbeating.
/// Requeued executions are immediately re-dispatched to another idle
/// runner (mirroring `RunDriver::dispatch`'s Remote branch); one still
/// left `PENDING` just waits for the next tick to retry.
async fn sweep_runners_once(ctx: &EngineContext) {
    let requeued = ctx.runners.sweep_ack_timeouts(|runner_id| {
        let runner = ctx.gateway.get_runner(runner_id).ok()?;
        let execution_id = runner.current_step_execution_id?;
        ctx.gateway.get_step_execution(execution_id).ok().map(|e| e.created_at_ms)
    });
    for execution_id in requeued {
        requeue_execution(ctx, execution_id).await;
    }

    let requeued = ctx.runners.sweep_dead_runners();
    for execution_id in requeued {
        requeue_execution(ctx, execution_id).await;
    }
}

/// Resets a dead/timed-out runner's execution to `Pending`, then
/// re-selects an idle runner and re-assigns it so the owning run's driver
/// (still holding this `execution_id` in its `pending` map, since a
/// requeue emits no `StepRunStatus` event of its own) eventually sees the
/// real terminal status the reassigned runner reports, instead of
/// stalling forever.
async fn requeue_execution(ctx: &EngineContext, execution_id: ExecutionId) {
    let was_eligible = ctx
        .gateway
        .update_step_execution(execution_id, |e| {
            let eligible = lazyaf_engine::should_requeue_on_runner_loss(e.status);
            if eligible {
                e.status = lazyaf_core::StepExecutionStatus::Pending;
                e.runner_id = None;
            }
            Ok(eligible)
        })
        .unwrap_or(false);
    if !was_eligible {
        return;
    }

    let Some((step, workspace, execution_key)) = redispatch_target(ctx, execution_id) else { return };
    let requested_type = requested_runner_type(&step);
    let runners = ctx.gateway.list_runners();
    let Some(runner) = select_runner(&runners, &requested_type, &step.requires, None) else {
        return;
    };
    let runner_id = runner.id;
    let now = ctx.clock.epoch_ms();
    let token = ctx.tokens.mint(step.step_id, now, lazyaf_engine::DEFAULT_TTL_SECONDS);
    let step_config = serde_json::json!({
        "step": step,
        "token": token,
        "workspace_volume": workspace.volume_name,
    });

    let _ = ctx.gateway.update_step_execution(execution_id, |e| {
        e.runner_id = Some(runner_id);
        Ok(())
    });
    if let Err(e) = ctx.runners.assign(runner_id, execution_id, step.step_id.as_str(), &execution_key, step_config).await {
        tracing::warn!(error = %e, %execution_id, "redispatch assign failed, leaving execution pending");
        let _ = ctx.gateway.update_step_execution(execution_id, |e| {
            e.runner_id = None;
            Ok(())
        });
    }
}

/// Looks up the `StepDef` and `Workspace` a requeued execution needs for
/// reassignment.
fn redispatch_target(ctx: &EngineContext, execution_id: ExecutionId) -> Option<(StepDef, Workspace, String)> {
    let execution = ctx.gateway.get_step_execution(execution_id).ok()?;
    let step_run = ctx.gateway.get_step_run(execution.step_run_id).ok()?;
    let run = ctx.gateway.get_pipeline_run(step_run.pipeline_run_id).ok()?;
    let pipeline = ctx.pipelines.get(run.pipeline_id).ok()?;
    let step = pipeline.step(step_run.step_id)?.clone();
    let workspace = ctx.gateway.get_workspace_for_run(run.id).ok()?;
    Some((step, workspace, execution.execution_key))
}

/// Startup + scheduled orphan recovery: fails executions whose run already
/// ended, garbage-collects workspaces past their grace period, and deletes
/// terminal executions past the retention window.
pub async fn sweep_orphans_once(ctx: &EngineContext) {
    let sweeper = OrphanRecoverySweeper::new(
        ctx.gateway.clone(),
        ctx.clock.clone(),
        ctx.config.orphan_grace_minutes * 60_000,
        ctx.config.completed_exec_retention_days * 86_400_000,
    );
    match sweeper.sweep_terminated_runs() {
        Ok(failed) if !failed.is_empty() => tracing::info!(count = failed.len(), "orphan sweep failed stale executions"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "orphan sweep failed"),
    }
    let cleaned = sweeper.sweep_workspaces(&ctx.workspaces).await;
    if !cleaned.is_empty() {
        tracing::info!(count = cleaned.len(), "orphan sweep cleaned up workspaces");
    }
    let deleted = sweeper.sweep_expired_executions();
    if deleted > 0 {
        tracing::info!(count = deleted, "orphan sweep deleted retained executions");
    }
}

/// Expires debug sessions past their `expires_at_ms` and cascades the
/// cancellation to whatever their forked run was still waiting on.
/// `DebugSessionService::sweep_expired` already transitioned each returned
/// session to `TIMEOUT`; the run itself is this sweep's job.
async fn sweep_debug_sessions_once(ctx: &EngineContext) {
    for session in ctx.debug.sweep_expired() {
        let _ = ctx.gateway.update_pipeline_run(session.pipeline_run_id, |r| {
            if !r.status.is_terminal() {
                r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Failed)?;
            }
            Ok(())
        });
        ctx.events.broadcast(lazyaf_core::Event::PipelineRunStatus {
            run_id: session.pipeline_run_id,
            status: PipelineStatus::Failed,
        });
    }
}

/// Spawns the three sweep loops. Intended to be called once from `main.rs`
/// after the orphan sweep's startup pass (see [`sweep_orphans_once`], run
/// synchronously before the server starts accepting traffic).
pub fn spawn(ctx: Arc<EngineContext>) {
    let runner_ctx = ctx.clone();
    tokio::spawn(async move {
        loop {
            sweep_runners_once(&runner_ctx).await;
            tokio::time::sleep(ACK_SWEEP_INTERVAL).await;
        }
    });

    let orphan_ctx = ctx.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(ORPHAN_SWEEP_INTERVAL).await;
            sweep_orphans_once(&orphan_ctx).await;
        }
    });

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(DEBUG_SWEEP_INTERVAL).await;
            sweep_debug_sessions_once(&ctx).await;
        }
    });
}

#[cfg(test)]
#[path = "sweepers_tests.rs"]
mod tests;
