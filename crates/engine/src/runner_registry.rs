// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote Executor / runner registry: runner selection,
//! assignment, ack/heartbeat timeouts, and the disconnect/reconnect recovery
//! duties, all driven through [`PersistenceGateway`] so the registry itself
//! holds no state of its own — only the gateway's `runners` table is
//! authoritative.

use std::sync::Arc;

use async_trait::async_trait;
use lazyaf_core::{
    Clock, EngineError, EngineResult, ExecutionId, Requirements, Runner, RunnerId, RunnerState,
    RunnerType, StepExecutionStatus,
};
use lazyaf_storage::PersistenceGateway;

/// How the backend pushes frames to an already-connected runner; the concrete impl in `lazyaf-daemon` holds the
/// live `axum` WebSocket sink per `runner_id`.
#[async_trait]
pub trait RunnerTransport: Send + Sync {
    async fn send_execute_step(
        &self,
        runner_id: RunnerId,
        step_id: &str,
        execution_key: &str,
        step_config: serde_json::Value,
    ) -> Result<(), EngineError>;

    async fn send_abort(&self, runner_id: RunnerId, step_id: &str) -> Result<(), EngineError>;
}

/// Picks an `IDLE` runner whose type matches and
/// whose labels satisfy every required hardware capability. Tie-break:
/// affinity to `affinity_workspace_label` (a runner whose labels already
/// carry it, i.e. was last used for this workspace) wins, else the runner
/// with the earliest `connected_at_ms` (a proxy for "longest idle" — the
/// registry has no separate idle-since timestamp distinct from heartbeat).
pub fn select_runner<'a>(
    runners: &'a [Runner],
    requested_type: &RunnerType,
    requires: &Requirements,
    affinity_workspace_label: Option<&str>,
) -> Option<&'a Runner> {
    let mut candidates: Vec<&Runner> = runners
        .iter()
        .filter(|r| r.status == RunnerState::Idle)
        .filter(|r| RunnerType::matches(requested_type, &r.runner_type))
        .filter(|r| r.satisfies(&requires.hardware))
        .collect();

    if let Some(label) = affinity_workspace_label {
        if let Some(pos) = candidates.iter().position(|r| r.labels.get("last_workspace").is_some_and(|v| v == label)) {
            return Some(candidates.swap_remove(pos));
        }
    }

    candidates.into_iter().min_by_key(|r| r.connected_at_ms.unwrap_or(0))
}

pub struct RunnerRegistry<C: Clock> {
    gateway: PersistenceGateway,
    transport: Arc<dyn RunnerTransport>,
    clock: C,
    pub ack_timeout_s: u64,
    pub death_timeout_s: u64,
}

impl<C: Clock> RunnerRegistry<C> {
    pub fn new(gateway: PersistenceGateway, transport: Arc<dyn RunnerTransport>, clock: C, ack_timeout_s: u64, death_timeout_s: u64) -> Self {
        Self { gateway, transport, clock, ack_timeout_s, death_timeout_s }
    }

    pub fn register(&self, runner: Runner) -> EngineResult<Runner> {
        let mut runner = runner;
        runner.status = RunnerState::Idle;
        runner.connected_at_ms = Some(self.clock.epoch_ms());
        runner.last_heartbeat_ms = Some(self.clock.epoch_ms());
        self.gateway.upsert_runner(runner.clone())?;
        Ok(runner)
    }

    pub fn heartbeat(&self, runner_id: RunnerId) -> EngineResult<()> {
        let now = self.clock.epoch_ms();
        self.gateway.update_runner(runner_id, |r| {
            r.last_heartbeat_ms = Some(now);
            Ok(())
        })
    }

    /// Assigns `execution_id` to `runner.id` and dispatches `execute_step`.
    pub async fn assign(
        &self,
        runner_id: RunnerId,
        execution_id: ExecutionId,
        step_id: &str,
        execution_key: &str,
        step_config: serde_json::Value,
    ) -> EngineResult<Runner> {
        let runner = self.gateway.update_runner(runner_id, |r| {
            if r.status != RunnerState::Idle {
                return Err(EngineError::conflict(format!("runner {runner_id} is not idle")));
            }
            r.status = RunnerState::Assigned;
            r.current_step_execution_id = Some(execution_id);
            Ok(r.clone())
        })?;

        self.transport.send_execute_step(runner_id, step_id, execution_key, step_config).await?;
        Ok(runner)
    }

    /// `ack {step_id}`: `ASSIGNED -> BUSY`.
    pub fn ack(&self, runner_id: RunnerId) -> EngineResult<Runner> {
        self.gateway.update_runner(runner_id, |r| {
            if r.status != RunnerState::Assigned {
                return Err(EngineError::conflict(format!("runner {runner_id} is not assigned")));
            }
            r.status = RunnerState::Busy;
            Ok(r.clone())
        })
    }

    /// `step_complete {step_id, exit_code, error?}`: `BUSY ->
    /// IDLE`, clears the current step. Finalizing the execution itself is
    /// the caller's job (it owns the `StepExecution` transition).
    pub fn complete(&self, runner_id: RunnerId) -> EngineResult<Runner> {
        self.gateway.update_runner(runner_id, |r| {
            r.status = RunnerState::Idle;
            r.current_step_execution_id = None;
            Ok(r.clone())
        })
    }

    /// "If no ACK within 5 s, transition to DEAD and requeue the step
    /// to PENDING". Returns the executions that need requeuing.
    pub fn sweep_ack_timeouts(&self, assigned_since_ms: impl Fn(RunnerId) -> Option<u64>) -> Vec<ExecutionId> {
        let now = self.clock.epoch_ms();
        let mut requeued = Vec::new();
        for runner in self.gateway.list_runners() {
            if runner.status != RunnerState::Assigned {
                continue;
            }
            let Some(since) = assigned_since_ms(runner.id) else { continue };
            if now.saturating_sub(since) > self.ack_timeout_s * 1000 {
                if let Some(execution_id) = runner.current_step_execution_id {
                    let _ = self.gateway.update_runner(runner.id, |r| {
                        r.status = RunnerState::Dead;
                        r.current_step_execution_id = None;
                        Ok(())
                    });
                    requeued.push(execution_id);
                }
            }
        }
        requeued
    }

    /// Runners past `death_timeout_s` without a
    /// heartbeat are declared `DEAD`, and whatever step they held is
    /// returned for requeuing to `PENDING`.
    pub fn sweep_dead_runners(&self) -> Vec<ExecutionId> {
        let cutoff = self.clock.epoch_ms().saturating_sub(self.death_timeout_s * 1000);
        let mut requeued = Vec::new();
        for runner_id in self.gateway.runners_past_heartbeat(cutoff) {
            if let Ok(runner) = self.gateway.get_runner(runner_id) {
                if let Some(execution_id) = runner.current_step_execution_id {
                    requeued.push(execution_id);
                }
            }
            let _ = self.gateway.update_runner(runner_id, |r| {
                r.status = RunnerState::Dead;
                r.current_step_execution_id = None;
                Ok(())
            });
        }
        requeued
    }

    /// Reconnect recovery: "if yes: continue; if reassigned: send
    /// abort; if gone: go IDLE". `claimed_step_execution_id` is what the
    /// reconnecting runner itself reports holding.
    pub async fn reconcile_reconnect(
        &self,
        runner_id: RunnerId,
        claimed_step_execution_id: Option<(ExecutionId, String)>,
    ) -> EngineResult<Runner> {
        let now = self.clock.epoch_ms();
        let runner = self.gateway.update_runner(runner_id, |r| {
            r.status = RunnerState::Connecting;
            r.last_heartbeat_ms = Some(now);
            Ok(r.clone())
        })?;

        match (runner.current_step_execution_id, claimed_step_execution_id) {
            (Some(expected), Some((claimed, _step_id))) if expected == claimed => {
                self.gateway.update_runner(runner_id, |r| {
                    r.status = RunnerState::Busy;
                    Ok(())
                })?;
                Ok(runner)
            }
            (Some(_), Some((_, step_id))) => {
                self.transport.send_abort(runner_id, &step_id).await?;
                self.gateway.update_runner(runner_id, |r| {
                    r.status = RunnerState::Idle;
                    r.current_step_execution_id = None;
                    Ok(())
                })
            }
            _ => self.gateway.update_runner(runner_id, |r| {
                r.status = RunnerState::Idle;
                r.current_step_execution_id = None;
                Ok(())
            }),
        }
    }

    /// Recovery duty for an outright disconnect (no reconnect): whatever
    /// `PREPARING|RUNNING` step the runner held resets to `PENDING`, runner
    /// pointer nulled.
    pub fn on_disconnect(&self, runner_id: RunnerId) -> EngineResult<Option<ExecutionId>> {
        let mut held = None;
        self.gateway.update_runner(runner_id, |r| {
            held = r.current_step_execution_id.take();
            r.status = RunnerState::Disconnected;
            Ok(())
        })?;
        Ok(held)
    }
}

/// Whether a `StepExecutionStatus` should be requeued to `PENDING` on
/// runner loss, rather than failed outright.
pub fn should_requeue_on_runner_loss(status: StepExecutionStatus) -> bool {
    matches!(status, StepExecutionStatus::Assigned | StepExecutionStatus::Preparing | StepExecutionStatus::Running)
}

#[cfg(test)]
#[path = "runner_registry_tests.rs"]
mod tests;
