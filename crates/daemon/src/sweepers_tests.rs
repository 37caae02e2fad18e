// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lazyaf_core::{PipelineStatus, RunId, StepExecutionStatus, StepId, StepRun};

use super::*;
use crate::run_driver::tests::test_context;

fn seed_terminated_run_with_orphaned_execution(ctx: &EngineContext) -> (RunId, lazyaf_core::ExecutionId) {
    let now = ctx.clock.epoch_ms();
    let run = lazyaf_core::PipelineRun::new(lazyaf_core::PipelineId::new(), lazyaf_core::TriggerType::Manual, now);
    let run_id = run.id;
    ctx.gateway.insert_pipeline_run(run).expect("insert run");
    ctx.gateway
        .update_pipeline_run(run_id, |r| {
            r.status = lazyaf_core::StateMachine::new(r.status).transition_to(PipelineStatus::Preparing)?;
            r.status = lazyaf_core::StateMachine::new(r.status).transition_to(PipelineStatus::Running)?;
            r.status = lazyaf_core::StateMachine::new(r.status).transition_to(PipelineStatus::Completing)?;
            r.status = lazyaf_core::StateMachine::new(r.status).transition_to(PipelineStatus::Failed)?;
            Ok(())
        })
        .expect("fail run");

    let step_run = StepRun::new(run_id, StepId::new(), 0, "build".to_string());
    let step_run_id = ctx.gateway.insert_step_run(step_run).expect("insert step run");
    let (execution, claimed) = ctx.gateway.claim_execution(run_id, 0, step_run_id, 1, now).expect("claim execution");
    assert!(claimed);
    (run_id, execution.id)
}

#[tokio::test]
async fn sweep_orphans_once_fails_executions_whose_run_already_ended() {
    let ctx = test_context();
    let (_, execution_id) = seed_terminated_run_with_orphaned_execution(&ctx);

    sweep_orphans_once(&ctx).await;

    let execution = ctx.gateway.get_step_execution(execution_id).expect("get execution");
    assert_eq!(execution.status, StepExecutionStatus::Failed);
}

#[tokio::test]
async fn sweep_debug_sessions_once_fails_the_run_when_the_session_times_out() {
    let ctx = test_context();
    let pipeline = lazyaf_core::Pipeline::new(
        lazyaf_core::PipelineId::new(),
        lazyaf_core::RepositoryId::new(),
        vec![crate::run_driver::tests::script_step("build")],
        Vec::new(),
    );
    let pipeline_id = pipeline.id;
    ctx.pipelines.register(pipeline).expect("register");

    let original_run = lazyaf_core::PipelineRun::new(pipeline_id, lazyaf_core::TriggerType::Manual, 0);
    let mut breakpoints = std::collections::HashSet::new();
    breakpoints.insert(0u32);
    let (debug_run, _session) = ctx
        .debug
        .create_debug_rerun(&original_run, breakpoints, "tok".to_string(), 0, 0)
        .expect("create debug rerun");

    sweep_debug_sessions_once(&ctx).await;

    let run = ctx.gateway.get_pipeline_run(debug_run.id).expect("get run");
    assert_eq!(run.status, PipelineStatus::Failed);
}
