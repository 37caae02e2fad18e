// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lazyaf_core::{EdgeAction, Requirements, StepId, StepType};

use super::*;

fn script_step() -> StepDef {
    StepDef {
        step_id: StepId::new(),
        name: "build".to_string(),
        step_type: StepType::Script { command: "make".to_string() },
        on_success: EdgeAction::Next,
        on_failure: EdgeAction::Stop,
        timeout_seconds: None,
        continue_in_context: false,
        required_runner_id: None,
        requires: Requirements::default(),
        successors: Vec::new(),
    }
}

fn agent_step() -> StepDef {
    StepDef {
        step_type: StepType::Agent {
            runner_type: "claude_code".to_string(),
            agent_config: serde_json::Value::Null,
        },
        ..script_step()
    }
}

#[test]
fn agent_steps_always_route_remote() {
    let decision = decide_route(&agent_step(), true, false, false);
    assert_eq!(decision.target, RouteTarget::Remote);
    assert_eq!(decision.fallback_reason, None);
}

#[test]
fn hardware_requirements_route_remote() {
    let mut step = script_step();
    step.requires = Requirements { hardware: vec!["gpu".to_string()] };
    let decision = decide_route(&step, true, false, false);
    assert_eq!(decision.target, RouteTarget::Remote);
}

#[test]
fn required_runner_id_routes_remote() {
    let mut step = script_step();
    step.required_runner_id = Some("rnr-specific".to_string());
    let decision = decide_route(&step, true, false, false);
    assert_eq!(decision.target, RouteTarget::Remote);
}

#[test]
fn local_executor_unavailable_falls_back_to_remote_with_reason() {
    let decision = decide_route(&script_step(), false, false, false);
    assert_eq!(decision.target, RouteTarget::Remote);
    assert_eq!(decision.fallback_reason, Some("local_executor_unavailable"));
}

#[test]
fn plain_script_step_routes_local_by_default() {
    let decision = decide_route(&script_step(), true, false, false);
    assert_eq!(decision.target, RouteTarget::Local);
    assert_eq!(decision.fallback_reason, None);
}

#[test]
fn force_local_overrides_every_other_rule() {
    let decision = decide_route(&agent_step(), false, true, false);
    assert_eq!(decision.target, RouteTarget::Local);
}

#[test]
fn force_remote_overrides_plain_script_step() {
    let decision = decide_route(&script_step(), true, false, true);
    assert_eq!(decision.target, RouteTarget::Remote);
    assert_eq!(decision.fallback_reason, None);
}
