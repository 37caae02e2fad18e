// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local Executor: runs a claimed `StepExecution` in a
//! container on this host through the [`ContainerOrchestrator`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use lazyaf_core::{
    Clock, EngineError, EngineResult, ExecutionId, RunId, StepDef, StepExecutionStatus, StepRunId,
    StepType, Workspace,
};
use lazyaf_storage::PersistenceGateway;

use crate::control_token::ControlTokenService;
use crate::orchestrator::{ContainerOrchestrator, ContainerSpec, ResourceLimits, VolumeMount};

/// Base images per step type.
pub const SCRIPT_IMAGE: &str = "lazyaf-base";
pub const CLAUDE_IMAGE: &str = "lazyaf-claude";
pub const GEMINI_IMAGE: &str = "lazyaf-gemini";

fn image_for(step: &StepDef) -> String {
    match &step.step_type {
        StepType::Script { .. } => SCRIPT_IMAGE.to_string(),
        StepType::Container { image, .. } => image.clone(),
        StepType::Agent { runner_type, .. } if runner_type == "gemini" => GEMINI_IMAGE.to_string(),
        StepType::Agent { .. } => CLAUDE_IMAGE.to_string(),
    }
}

fn command_for(step: &StepDef) -> Option<Vec<String>> {
    match &step.step_type {
        StepType::Script { command } => Some(vec!["/bin/sh".to_string(), "-c".to_string(), command.clone()]),
        StepType::Container { command: Some(cmd), .. } => Some(vec!["/bin/sh".to_string(), "-c".to_string(), cmd.clone()]),
        StepType::Container { command: None, .. } => None,
        StepType::Agent { .. } => None,
    }
}

/// `HOME=/workspace/home`, XDG paths, `LAZYAF_*` ids.
fn build_env(run_id: RunId, step_run_id: StepRunId, execution_id: ExecutionId, token: &str, backend_url: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("HOME".to_string(), "/workspace/home".to_string());
    env.insert("XDG_CACHE_HOME".to_string(), "/workspace/.cache".to_string());
    env.insert("XDG_CONFIG_HOME".to_string(), "/workspace/.config".to_string());
    env.insert("LAZYAF_RUN_ID".to_string(), run_id.to_string());
    env.insert("LAZYAF_STEP_RUN_ID".to_string(), step_run_id.to_string());
    env.insert("LAZYAF_EXECUTION_ID".to_string(), execution_id.to_string());
    env.insert("LAZYAF_BACKEND_URL".to_string(), backend_url.to_string());
    env.insert("LAZYAF_STEP_TOKEN".to_string(), token.to_string());
    env
}

pub struct LocalExecutor<C: Clock> {
    gateway: PersistenceGateway,
    orchestrator: Arc<dyn ContainerOrchestrator>,
    tokens: ControlTokenService,
    clock: C,
    backend_url: String,
}

impl<C: Clock> LocalExecutor<C> {
    pub fn new(
        gateway: PersistenceGateway,
        orchestrator: Arc<dyn ContainerOrchestrator>,
        tokens: ControlTokenService,
        clock: C,
        backend_url: String,
    ) -> Self {
        Self { gateway, orchestrator, tokens, clock, backend_url }
    }

    /// Runs one claimed execution end to end. The
    /// caller is responsible for step 1 (claiming via [`crate::router`]).
    pub async fn execute(
        &self,
        run_id: RunId,
        step_run_id: StepRunId,
        execution_id: ExecutionId,
        step: &StepDef,
        workspace: &Workspace,
        timeout_seconds: u64,
    ) -> EngineResult<i32> {
        let now = self.clock.epoch_ms();
        let token = self.tokens.mint(step.step_id, now, crate::control_token::DEFAULT_TTL_SECONDS);
        let env = build_env(run_id, step_run_id, execution_id, &token, &self.backend_url);

        let mut labels = BTreeMap::new();
        labels.insert("lazyaf.managed".to_string(), "true".to_string());
        labels.insert("lazyaf.step_id".to_string(), step.step_id.to_string());
        labels.insert("lazyaf.step_run_id".to_string(), step_run_id.to_string());
        labels.insert("lazyaf.pipeline_run_id".to_string(), run_id.to_string());

        let spec = ContainerSpec {
            name: format!("lazyaf-{}", execution_id.short(12)),
            image: image_for(step),
            command: command_for(step),
            env,
            mounts: vec![VolumeMount {
                volume_name: workspace.volume_name.clone(),
                container_path: "/workspace".to_string(),
                read_only: false,
            }],
            network: None,
            labels,
            resources: ResourceLimits::default(),
        };

        self.gateway.transition_step_execution(
            execution_id,
            &[StepExecutionStatus::Pending, StepExecutionStatus::Assigned],
            StepExecutionStatus::Preparing,
            None,
            None,
            self.clock.epoch_ms(),
        )?;

        let handle = self
            .orchestrator
            .run_container(spec)
            .await
            .map_err(|e| EngineError::new(e.kind(), e.to_string()))?;

        self.gateway.update_step_execution(execution_id, |exec| {
            exec.container_id = Some(handle.0.clone());
            Ok(())
        })?;
        self.gateway.transition_step_execution(
            execution_id,
            &[StepExecutionStatus::Preparing],
            StepExecutionStatus::Running,
            None,
            None,
            self.clock.epoch_ms(),
        )?;

        let exit_code = tokio::select! {
            result = self.orchestrator.wait(&handle) => {
                result.map_err(|e| EngineError::new(e.kind(), e.to_string()))?
            }
            _ = tokio::time::sleep(std::time::Duration::from_millis(timeout_seconds * 1000)) => {
                let _ = self.orchestrator.kill(&handle).await;
                self.gateway.transition_step_execution(
                    execution_id,
                    &[StepExecutionStatus::Running],
                    StepExecutionStatus::Timeout,
                    None,
                    Some("step exceeded timeout_seconds".to_string()),
                    self.clock.epoch_ms(),
                )?;
                let _ = self.orchestrator.remove(&handle).await;
                return Err(EngineError::new(lazyaf_core::ErrorKind::Timeout, "step timed out"));
            }
        };

        let outcome = lazyaf_core::StepExecution::outcome_status(exit_code);
        self.gateway.transition_step_execution(
            execution_id,
            &[StepExecutionStatus::Running],
            StepExecutionStatus::Completing,
            None,
            None,
            self.clock.epoch_ms(),
        )?;
        self.gateway.transition_step_execution(
            execution_id,
            &[StepExecutionStatus::Completing],
            outcome,
            Some(exit_code),
            None,
            self.clock.epoch_ms(),
        )?;

        let _ = self.orchestrator.remove(&handle).await;
        Ok(exit_code)
    }
}

#[cfg(test)]
#[path = "local_executor_tests.rs"]
mod tests;
