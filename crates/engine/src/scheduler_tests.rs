// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lazyaf_core::{PipelineId, RepositoryId, StepDef, StepType, WorkspaceId};

use super::*;

fn script_step(step_id: StepId, on_success: EdgeAction, on_failure: EdgeAction) -> StepDef {
    script_step_with_successors(step_id, on_success, on_failure, Vec::new())
}

fn script_step_with_successors(
    step_id: StepId,
    on_success: EdgeAction,
    on_failure: EdgeAction,
    successors: Vec<StepId>,
) -> StepDef {
    StepDef {
        step_id,
        name: "step".to_string(),
        step_type: StepType::Script { command: "true".to_string() },
        on_success,
        on_failure,
        timeout_seconds: None,
        continue_in_context: false,
        required_runner_id: None,
        requires: Default::default(),
        successors,
    }
}

#[test]
fn start_run_returns_the_single_entry_step() {
    let a = StepId::new();
    let b = StepId::new();
    let pipeline = Pipeline::new(
        PipelineId::new(),
        RepositoryId::new(),
        vec![
            script_step_with_successors(a, EdgeAction::Next, EdgeAction::Stop, vec![b]),
            script_step(b, EdgeAction::Stop, EdgeAction::Stop),
        ],
        vec![],
    );

    assert_eq!(start_run(&pipeline), vec![a]);
}

#[test]
fn next_edge_advances_to_successor_within_the_same_run() {
    let a = StepId::new();
    let b = StepId::new();
    let pipeline = Pipeline::new(
        PipelineId::new(),
        RepositoryId::new(),
        vec![
            script_step_with_successors(a, EdgeAction::Next, EdgeAction::Stop, vec![b]),
            script_step(b, EdgeAction::Stop, EdgeAction::Stop),
        ],
        vec![],
    );

    let outcome = on_step_completed(&pipeline, RunId::new(), WorkspaceId::new(), a, true);
    assert_eq!(outcome.next_steps, vec![b]);
    assert!(outcome.effects.is_empty());
}

#[test]
fn fan_out_then_fan_in_only_readies_d_once_both_b_and_c_complete() {
    let a = StepId::new();
    let b = StepId::new();
    let c = StepId::new();
    let d = StepId::new();
    let pipeline = Pipeline::new(
        PipelineId::new(),
        RepositoryId::new(),
        vec![
            script_step_with_successors(a, EdgeAction::Next, EdgeAction::Stop, vec![b, c]),
            script_step_with_successors(b, EdgeAction::Next, EdgeAction::Stop, vec![d]),
            script_step_with_successors(c, EdgeAction::Next, EdgeAction::Stop, vec![d]),
            script_step(d, EdgeAction::Stop, EdgeAction::Stop),
        ],
        vec![],
    );

    let outcome = on_step_completed(&pipeline, RunId::new(), WorkspaceId::new(), a, true);
    assert_eq!(outcome.next_steps, vec![b, c]);

    let mut completed: HashSet<StepId> = HashSet::new();
    completed.insert(a);
    completed.insert(b);
    let b_outcome = on_step_completed(&pipeline, RunId::new(), WorkspaceId::new(), b, true);
    assert!(ready_successors(&pipeline, &completed, &b_outcome.next_steps).is_empty());

    completed.insert(c);
    let c_outcome = on_step_completed(&pipeline, RunId::new(), WorkspaceId::new(), c, true);
    assert_eq!(ready_successors(&pipeline, &completed, &c_outcome.next_steps), vec![d]);
}

#[test]
fn stop_edge_schedules_nothing() {
    let a = StepId::new();
    let pipeline = Pipeline::new(
        PipelineId::new(),
        RepositoryId::new(),
        vec![script_step(a, EdgeAction::Stop, EdgeAction::Stop)],
        vec![],
    );

    let outcome = on_step_completed(&pipeline, RunId::new(), WorkspaceId::new(), a, true);
    assert!(outcome.next_steps.is_empty());
    assert!(outcome.effects.is_empty());
}

#[test]
fn trigger_edge_enqueues_a_subrun_effect() {
    let a = StepId::new();
    let target = StepId::new();
    let pipeline = Pipeline::new(
        PipelineId::new(),
        RepositoryId::new(),
        vec![
            script_step(a, EdgeAction::Trigger { step_id: target }, EdgeAction::Stop),
            script_step(target, EdgeAction::Stop, EdgeAction::Stop),
        ],
        vec![],
    );

    let run_id = RunId::new();
    let outcome = on_step_completed(&pipeline, run_id, WorkspaceId::new(), a, true);
    assert!(outcome.next_steps.is_empty());
    match outcome.effects.as_slice() {
        [Effect::TriggerSubrun { from_run_id, step_id }] => {
            assert_eq!(*from_run_id, run_id);
            assert_eq!(*step_id, target);
        }
        other => panic!("expected a single TriggerSubrun effect, got {other:?}"),
    }
}

#[test]
fn merge_edge_fast_forwards_the_named_branch() {
    let a = StepId::new();
    let pipeline = Pipeline::new(
        PipelineId::new(),
        RepositoryId::new(),
        vec![script_step(a, EdgeAction::Merge { branch: "main".to_string() }, EdgeAction::Stop)],
        vec![],
    );

    let workspace_id = WorkspaceId::new();
    let outcome = on_step_completed(&pipeline, RunId::new(), workspace_id, a, true);
    match outcome.effects.as_slice() {
        [Effect::FastForwardBranch { workspace_id: ws, branch }] => {
            assert_eq!(*ws, workspace_id);
            assert_eq!(branch, "main");
        }
        other => panic!("expected a single FastForwardBranch effect, got {other:?}"),
    }
}

#[test]
fn on_failure_edge_is_used_when_the_step_did_not_succeed() {
    let a = StepId::new();
    let failure_target = StepId::new();
    let pipeline = Pipeline::new(
        PipelineId::new(),
        RepositoryId::new(),
        vec![
            script_step(a, EdgeAction::Stop, EdgeAction::Trigger { step_id: failure_target }),
            script_step(failure_target, EdgeAction::Stop, EdgeAction::Stop),
        ],
        vec![],
    );

    let outcome = on_step_completed(&pipeline, RunId::new(), WorkspaceId::new(), a, false);
    assert!(matches!(outcome.effects.as_slice(), [Effect::TriggerSubrun { .. }]));
}

#[test]
fn unknown_step_schedules_nothing() {
    let pipeline = Pipeline::new(PipelineId::new(), RepositoryId::new(), vec![], vec![]);
    let outcome = on_step_completed(&pipeline, RunId::new(), WorkspaceId::new(), StepId::new(), true);
    assert!(outcome.next_steps.is_empty());
    assert!(outcome.effects.is_empty());
}
