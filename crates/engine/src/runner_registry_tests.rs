// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use lazyaf_core::{FakeClock, StepExecutionStatus};
use parking_lot::Mutex;

use super::*;

#[derive(Default)]
struct RecordingTransport {
    executed: Mutex<Vec<(RunnerId, String)>>,
    aborted: Mutex<Vec<(RunnerId, String)>>,
}

#[async_trait]
impl RunnerTransport for RecordingTransport {
    async fn send_execute_step(&self, runner_id: RunnerId, step_id: &str, _execution_key: &str, _step_config: serde_json::Value) -> Result<(), EngineError> {
        self.executed.lock().push((runner_id, step_id.to_string()));
        Ok(())
    }

    async fn send_abort(&self, runner_id: RunnerId, step_id: &str) -> Result<(), EngineError> {
        self.aborted.lock().push((runner_id, step_id.to_string()));
        Ok(())
    }
}

fn registry(transport: Arc<RecordingTransport>) -> RunnerRegistry<FakeClock> {
    RunnerRegistry::new(PersistenceGateway::new(), transport, FakeClock::new(), 5, 30)
}

fn idle_runner(runner_type: RunnerType) -> Runner {
    Runner::new("ci-runner".to_string(), runner_type)
}

#[test]
fn select_runner_prefers_affinity_label() {
    let mut affine = idle_runner(RunnerType::Any);
    affine.status = RunnerState::Idle;
    affine.labels.insert("last_workspace".to_string(), "wks-abc".to_string());
    let mut plain = idle_runner(RunnerType::Any);
    plain.status = RunnerState::Idle;

    let runners = vec![plain.clone(), affine.clone()];
    let picked = select_runner(&runners, &RunnerType::Any, &Requirements::default(), Some("wks-abc")).unwrap();
    assert_eq!(picked.id, affine.id);
}

#[test]
fn select_runner_filters_by_type_and_hardware() {
    let mut gpu_runner = idle_runner(RunnerType::Any);
    gpu_runner.status = RunnerState::Idle;
    gpu_runner.labels.insert("gpu".to_string(), "true".to_string());
    let mut plain_runner = idle_runner(RunnerType::Any);
    plain_runner.status = RunnerState::Idle;

    let runners = vec![plain_runner, gpu_runner.clone()];
    let requires = Requirements { hardware: vec!["gpu".to_string()] };
    let picked = select_runner(&runners, &RunnerType::Any, &requires, None).unwrap();
    assert_eq!(picked.id, gpu_runner.id);
}

#[test]
fn select_runner_ignores_busy_runners() {
    let mut busy = idle_runner(RunnerType::Any);
    busy.status = RunnerState::Busy;
    let runners = vec![busy];
    assert!(select_runner(&runners, &RunnerType::Any, &Requirements::default(), None).is_none());
}

#[tokio::test]
async fn assign_transitions_idle_to_assigned_and_dispatches() {
    let transport = Arc::new(RecordingTransport::default());
    let reg = registry(transport.clone());
    let runner = reg.register(Runner::new("r1".to_string(), RunnerType::Any)).unwrap();

    let assigned = reg
        .assign(runner.id, ExecutionId::new(), "stp-1", "run:0:1", serde_json::json!({}))
        .await
        .unwrap();

    assert_eq!(assigned.status, RunnerState::Assigned);
    assert_eq!(transport.executed.lock().len(), 1);
}

#[tokio::test]
async fn ack_then_complete_round_trips_through_busy() {
    let reg = registry(Arc::new(RecordingTransport::default()));
    let runner = reg.register(Runner::new("r1".to_string(), RunnerType::Any)).unwrap();
    reg.assign(runner.id, ExecutionId::new(), "stp-1", "run:0:1", serde_json::json!({})).await.unwrap();

    let busy = reg.ack(runner.id).unwrap();
    assert_eq!(busy.status, RunnerState::Busy);

    let idle = reg.complete(runner.id).unwrap();
    assert_eq!(idle.status, RunnerState::Idle);
    assert!(idle.current_step_execution_id.is_none());
}

#[tokio::test]
async fn reconcile_reconnect_aborts_when_step_was_reassigned() {
    let transport = Arc::new(RecordingTransport::default());
    let reg = registry(transport.clone());
    let runner = reg.register(Runner::new("r1".to_string(), RunnerType::Any)).unwrap();
    let execution_id = ExecutionId::new();
    reg.assign(runner.id, execution_id, "stp-1", "run:0:1", serde_json::json!({})).await.unwrap();

    let other_execution = ExecutionId::new();
    let reconciled = reg
        .reconcile_reconnect(runner.id, Some((other_execution, "stp-1".to_string())))
        .await
        .unwrap();

    assert_eq!(transport.aborted.lock().len(), 1);
    let final_state = reg.gateway.get_runner(reconciled.id).unwrap();
    assert_eq!(final_state.status, RunnerState::Idle);
}

#[test]
fn should_requeue_on_runner_loss_only_for_in_flight_statuses() {
    assert!(should_requeue_on_runner_loss(StepExecutionStatus::Running));
    assert!(!should_requeue_on_runner_loss(StepExecutionStatus::Completed));
}
