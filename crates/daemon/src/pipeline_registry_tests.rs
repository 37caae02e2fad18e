// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lazyaf_core::{EdgeAction, Pipeline, Requirements, RepositoryId, StepDef, StepId, StepType};

use super::*;

fn single_step_pipeline() -> Pipeline {
    let step = StepDef {
        step_id: StepId::new(),
        name: "build".into(),
        step_type: StepType::Script { command: "echo hi".into() },
        on_success: EdgeAction::Stop,
        on_failure: EdgeAction::Stop,
        timeout_seconds: Some(60),
        continue_in_context: false,
        required_runner_id: None,
        requires: Requirements::default(),
        successors: Vec::new(),
    };
    Pipeline::new(PipelineId::new(), RepositoryId::new(), vec![step], Vec::new())
}

#[test]
fn register_then_get_round_trips() {
    let registry = PipelineRegistry::new();
    let pipeline = single_step_pipeline();
    let id = pipeline.id;

    registry.register(pipeline).expect("register");
    let fetched = registry.get(id).expect("get");
    assert_eq!(fetched.id, id);
}

#[test]
fn get_unknown_pipeline_is_not_found() {
    let registry = PipelineRegistry::new();
    let err = registry.get(PipelineId::new()).unwrap_err();
    assert_eq!(err.kind(), lazyaf_core::ErrorKind::NotFound);
}

#[test]
fn register_rejects_an_invalid_dag() {
    let registry = PipelineRegistry::new();
    let mut pipeline = single_step_pipeline();
    let dangling = StepId::new();
    pipeline.steps[0].on_success = EdgeAction::Trigger { step_id: dangling };

    let err = registry.register(pipeline).unwrap_err();
    assert_eq!(err.kind(), lazyaf_core::ErrorKind::Fatal);
}

#[test]
fn register_replaces_a_prior_definition_with_the_same_id() {
    let registry = PipelineRegistry::new();
    let first = single_step_pipeline();
    let id = first.id;
    registry.register(first).expect("register first");

    let mut second = single_step_pipeline();
    second.id = id;
    registry.register(second.clone()).expect("register second");

    assert_eq!(registry.get(id).expect("get").steps.len(), second.steps.len());
    assert_eq!(registry.list().len(), 1);
}

#[test]
fn remove_drops_the_definition() {
    let registry = PipelineRegistry::new();
    let pipeline = single_step_pipeline();
    let id = pipeline.id;
    registry.register(pipeline).expect("register");

    assert!(registry.remove(id).is_some());
    assert!(registry.get(id).is_err());
}
