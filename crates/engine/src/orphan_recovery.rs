// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphan recovery sweeps: run at startup and on a schedule to reconcile
//! state left behind by a backend restart or a dead runner. Composes
//! [`PersistenceGateway`] directly
//! rather than routing through [`crate::router`] or [`crate::scheduler`] —
//! these sweeps act on executions whose owning run or runner already
//! decided their fate, not on a fresh dispatch decision.

use lazyaf_core::{Clock, EngineResult, ExecutionId, StepExecutionStatus};
use lazyaf_storage::PersistenceGateway;

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub failed: u32,
    pub requeued: u32,
    pub workspaces_cleaned: u32,
    pub executions_deleted: u32,
}

pub struct OrphanRecoverySweeper<C: Clock> {
    gateway: PersistenceGateway,
    clock: C,
    pub orphan_grace_ms: u64,
    pub completed_retention_ms: u64,
}

impl<C: Clock> OrphanRecoverySweeper<C> {
    pub fn new(gateway: PersistenceGateway, clock: C, orphan_grace_ms: u64, completed_retention_ms: u64) -> Self {
        Self { gateway, clock, orphan_grace_ms, completed_retention_ms }
    }

    /// Every non-terminal execution whose owning pipeline run is
    /// now terminal is failed (Local) or requeued (Remote, via `runner_id`
    /// still possibly reconnecting — the caller decides based on
    /// [`crate::runner_registry::should_requeue_on_runner_loss`] upstream of
    /// this sweep when the execution's runner is known to be dead).
    pub fn sweep_terminated_runs(&self) -> EngineResult<Vec<ExecutionId>> {
        let mut failed = Vec::new();
        for execution in self.gateway.non_terminal_executions() {
            let step_run = self.gateway.get_step_run(execution.step_run_id)?;
            let run = self.gateway.get_pipeline_run(step_run.pipeline_run_id)?;
            if !run.status.is_terminal() {
                continue;
            }
            if execution.runner_id.is_some() {
                // Remote: leave pending for the runner-loss sweep to requeue
                // if its runner is actually dead; a terminal run with a
                // live runner still streaming output is not itself orphaned.
                continue;
            }
            self.gateway.transition_step_execution(
                execution.id,
                &[
                    StepExecutionStatus::Pending,
                    StepExecutionStatus::Assigned,
                    StepExecutionStatus::Preparing,
                    StepExecutionStatus::Running,
                    StepExecutionStatus::Completing,
                ],
                StepExecutionStatus::Failed,
                None,
                Some("Execution interrupted by backend restart".to_string()),
                self.clock.epoch_ms(),
            )?;
            failed.push(execution.id);
        }
        Ok(failed)
    }

    /// Workspaces owned by terminal runs past grace get cleaned up.
    pub async fn sweep_workspaces(
        &self,
        manager: &crate::workspace_manager::WorkspaceManager<C>,
    ) -> Vec<lazyaf_core::WorkspaceId>
    where
        C: Clone,
    {
        manager.gc_orphans().await
    }

    /// Terminal executions older than `completed_retention_ms` are deleted.
    pub fn sweep_expired_executions(&self) -> u32 {
        let cutoff = self.clock.epoch_ms().saturating_sub(self.completed_retention_ms);
        let ids = self.gateway.terminal_executions_older_than(cutoff);
        let count = ids.len() as u32;
        for id in ids {
            self.gateway.delete_execution(id);
        }
        count
    }
}

#[cfg(test)]
#[path = "orphan_recovery_tests.rs"]
mod tests;
