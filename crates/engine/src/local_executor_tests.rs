// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use lazyaf_core::{
    EdgeAction, RepositoryId, Requirements, RunId, StepId, StepRunId, StepType, SystemClock,
    Workspace,
};

use super::*;
use crate::orchestrator::{ContainerHandle, ContainerSpec, OrchestratorError};

struct ScriptedOrchestrator {
    exit_code: i32,
    hang: bool,
}

#[async_trait]
impl ContainerOrchestrator for ScriptedOrchestrator {
    async fn create_volume(&self, _name: &str, _labels: &BTreeMap<String, String>) -> Result<(), OrchestratorError> {
        Ok(())
    }
    async fn remove_volume(&self, _name: &str) -> Result<(), OrchestratorError> {
        Ok(())
    }
    async fn run_container(&self, _spec: ContainerSpec) -> Result<ContainerHandle, OrchestratorError> {
        Ok(ContainerHandle("container-1".to_string()))
    }
    async fn wait(&self, _handle: &ContainerHandle) -> Result<i32, OrchestratorError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(self.exit_code)
    }
    async fn kill(&self, _handle: &ContainerHandle) -> Result<(), OrchestratorError> {
        Ok(())
    }
    async fn remove(&self, _handle: &ContainerHandle) -> Result<(), OrchestratorError> {
        Ok(())
    }
    async fn exec(&self, _handle: &ContainerHandle, _cmd: &[String]) -> Result<ContainerHandle, OrchestratorError> {
        unimplemented!()
    }
    async fn stream_logs(&self, _handle: &ContainerHandle, _since: u64) -> Result<Vec<lazyaf_core::LogLine>, OrchestratorError> {
        Ok(Vec::new())
    }
    async fn image_present(&self, _image: &str) -> Result<bool, OrchestratorError> {
        Ok(true)
    }
}

fn script_step() -> StepDef {
    StepDef {
        step_id: StepId::new(),
        name: "build".to_string(),
        step_type: StepType::Script { command: "true".to_string() },
        on_success: EdgeAction::Next,
        on_failure: EdgeAction::Stop,
        timeout_seconds: Some(1),
        continue_in_context: false,
        required_runner_id: None,
        requires: Requirements::default(),
        successors: Vec::new(),
    }
}

fn workspace() -> Workspace {
    Workspace::new(RunId::new(), RepositoryId::new(), "main".to_string(), 0)
}

fn executor(exit_code: i32, hang: bool) -> (LocalExecutor<SystemClock>, PersistenceGateway) {
    let gateway = PersistenceGateway::new();
    let executor = LocalExecutor::new(
        gateway.clone(),
        Arc::new(ScriptedOrchestrator { exit_code, hang }),
        ControlTokenService::new(b"secret".to_vec()),
        SystemClock,
        "http://localhost:8080".to_string(),
    );
    (executor, gateway)
}

fn seed_execution(gateway: &PersistenceGateway, run_id: RunId, step_run_id: StepRunId) -> ExecutionId {
    let (execution, _) = gateway.claim_execution(run_id, 0, step_run_id, 1, 0).unwrap();
    execution.id
}

#[tokio::test]
async fn successful_command_completes_with_zero_exit_code() {
    let (executor, gateway) = executor(0, false);
    let run_id = RunId::new();
    let step_run_id = StepRunId::new();
    let execution_id = seed_execution(&gateway, run_id, step_run_id);
    let step = script_step();
    let ws = workspace();

    let exit_code = executor.execute(run_id, step_run_id, execution_id, &step, &ws, 5).await.unwrap();
    assert_eq!(exit_code, 0);

    let execution = gateway.get_step_execution(execution_id).unwrap();
    assert_eq!(execution.status, StepExecutionStatus::Completed);
    assert_eq!(execution.exit_code, Some(0));
}

#[tokio::test]
async fn nonzero_exit_code_fails_the_execution() {
    let (executor, gateway) = executor(1, false);
    let run_id = RunId::new();
    let step_run_id = StepRunId::new();
    let execution_id = seed_execution(&gateway, run_id, step_run_id);

    let exit_code = executor.execute(run_id, step_run_id, execution_id, &script_step(), &workspace(), 5).await.unwrap();
    assert_eq!(exit_code, 1);

    let execution = gateway.get_step_execution(execution_id).unwrap();
    assert_eq!(execution.status, StepExecutionStatus::Failed);
}

#[tokio::test]
async fn hung_container_is_killed_on_timeout() {
    let (executor, gateway) = executor(0, true);
    let run_id = RunId::new();
    let step_run_id = StepRunId::new();
    let execution_id = seed_execution(&gateway, run_id, step_run_id);

    let err = executor
        .execute(run_id, step_run_id, execution_id, &script_step(), &workspace(), 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), lazyaf_core::ErrorKind::Timeout);

    let execution = gateway.get_step_execution(execution_id).unwrap();
    assert_eq!(execution.status, StepExecutionStatus::Timeout);
}
