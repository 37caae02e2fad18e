// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lazyaf_core::{
    ErrorKind, PipelineStatus, RepositoryId, RunnerState, RunnerType, StepExecutionStatus,
    TriggerType, Workspace,
};

fn gw() -> PersistenceGateway {
    PersistenceGateway::new()
}

#[test]
fn claim_execution_is_idempotent() {
    let gw = gw();
    let run = PipelineRun::new(lazyaf_core::PipelineId::new(), TriggerType::Manual, 0);
    let run_id = run.id;
    gw.insert_pipeline_run(run).unwrap();
    let step_run = StepRun::new(run_id, lazyaf_core::StepId::new(), 0, "a".to_string());
    let step_run_id = gw.insert_step_run(step_run).unwrap();

    let (first, claimed1) = gw.claim_execution(run_id, 0, step_run_id, 1, 100).unwrap();
    let (second, claimed2) = gw.claim_execution(run_id, 0, step_run_id, 1, 200).unwrap();

    assert!(claimed1);
    assert!(!claimed2);
    assert_eq!(first.id, second.id);
    assert_eq!(first.execution_key, lazyaf_core::make_execution_key(&run_id, 0, 1));
}

#[test]
fn duplicate_terminal_write_with_same_values_is_noop() {
    let gw = gw();
    let run = PipelineRun::new(lazyaf_core::PipelineId::new(), TriggerType::Manual, 0);
    let run_id = run.id;
    gw.insert_pipeline_run(run).unwrap();
    let step_run = StepRun::new(run_id, lazyaf_core::StepId::new(), 0, "a".to_string());
    let step_run_id = gw.insert_step_run(step_run).unwrap();
    let (exec, _) = gw.claim_execution(run_id, 0, step_run_id, 1, 0).unwrap();

    let allowed = &[
        StepExecutionStatus::Pending,
        StepExecutionStatus::Assigned,
        StepExecutionStatus::Preparing,
        StepExecutionStatus::Running,
        StepExecutionStatus::Completing,
    ];
    gw.transition_step_execution(exec.id, allowed, StepExecutionStatus::Completed, Some(0), None, 10).unwrap();
    // Second identical write is a no-op success.
    let second = gw
        .transition_step_execution(exec.id, allowed, StepExecutionStatus::Completed, Some(0), None, 20)
        .unwrap();
    assert_eq!(second.status, StepExecutionStatus::Completed);
    assert_eq!(second.exit_code, Some(0));
}

#[test]
fn inconsistent_terminal_write_is_conflict_and_does_not_mutate() {
    let gw = gw();
    let run = PipelineRun::new(lazyaf_core::PipelineId::new(), TriggerType::Manual, 0);
    let run_id = run.id;
    gw.insert_pipeline_run(run).unwrap();
    let step_run = StepRun::new(run_id, lazyaf_core::StepId::new(), 0, "a".to_string());
    let step_run_id = gw.insert_step_run(step_run).unwrap();
    let (exec, _) = gw.claim_execution(run_id, 0, step_run_id, 1, 0).unwrap();

    let allowed = &[StepExecutionStatus::Running];
    gw.transition_step_execution(exec.id, allowed, StepExecutionStatus::Completed, Some(0), None, 10).unwrap();

    let err = gw
        .transition_step_execution(exec.id, allowed, StepExecutionStatus::Completed, Some(1), None, 20)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let unchanged = gw.get_step_execution(exec.id).unwrap();
    assert_eq!(unchanged.exit_code, Some(0));
}

#[test]
fn workspace_lease_balance() {
    let gw = gw();
    let run_id = RunId::new();
    let mut ws = Workspace::new(run_id, RepositoryId::new(), "main".to_string(), 0);
    ws.status = lazyaf_core::WorkspaceStatus::Ready;
    let id = ws.id;
    gw.insert_workspace(ws).unwrap();

    let leased = gw.acquire_lease(id, 1).unwrap();
    assert_eq!(leased.use_count, 1);
    assert_eq!(leased.status, lazyaf_core::WorkspaceStatus::InUse);

    let leased2 = gw.acquire_lease(id, 2).unwrap();
    assert_eq!(leased2.use_count, 2);

    gw.release_lease(id, 3).unwrap();
    let still_in_use = gw.get_workspace(id).unwrap();
    assert_eq!(still_in_use.use_count, 1);
    assert_eq!(still_in_use.status, lazyaf_core::WorkspaceStatus::InUse);

    let released = gw.release_lease(id, 4).unwrap();
    assert_eq!(released.use_count, 0);
    assert_eq!(released.status, lazyaf_core::WorkspaceStatus::Ready);
}

#[test]
fn cleaning_refused_while_in_use() {
    let gw = gw();
    let run_id = RunId::new();
    let mut ws = Workspace::new(run_id, RepositoryId::new(), "main".to_string(), 0);
    ws.status = lazyaf_core::WorkspaceStatus::Ready;
    let id = ws.id;
    gw.insert_workspace(ws).unwrap();
    gw.acquire_lease(id, 1).unwrap();

    let err = gw
        .transition_workspace(id, &[lazyaf_core::WorkspaceStatus::Ready], lazyaf_core::WorkspaceStatus::Cleaning)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn trigger_dedup_within_window() {
    let gw = gw();
    let run_a = RunId::new();
    let run_b = RunId::new();
    let key = "push:rep-abc:main".to_string();

    let first = gw.record_trigger_if_new(key.clone(), run_a, 1_000, 3600).unwrap();
    assert!(first.is_none());

    let second = gw.record_trigger_if_new(key.clone(), run_b, 1_500, 3600).unwrap();
    assert_eq!(second, Some(run_a));

    // Outside the window, it's fresh again.
    let third = gw.record_trigger_if_new(key, run_b, 1_000 + 3600 * 1000 + 1, 3600).unwrap();
    assert!(third.is_none());
}

#[test]
fn runner_invariant_and_listing() {
    let gw = gw();
    let mut runner = Runner::new("r1".to_string(), RunnerType::Any);
    runner.status = RunnerState::Idle;
    let id = runner.id;
    gw.upsert_runner(runner).unwrap();
    assert_eq!(gw.list_runners().len(), 1);
    assert!(gw.get_runner(id).unwrap().invariant_holds());
}

#[test]
fn pipeline_run_not_found_is_not_found_kind() {
    let gw = gw();
    let err = gw.get_pipeline_run(RunId::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn update_if_status_in_rejects_unexpected_prior_state() {
    let result = update_if_status_in(
        PipelineStatus::Completed,
        &[PipelineStatus::Running],
        PipelineStatus::Failed,
    );
    assert!(result.is_err());
}
