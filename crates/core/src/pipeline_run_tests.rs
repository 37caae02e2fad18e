// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state_machine::StateMachine;

#[test]
fn happy_path_reaches_completed() {
    use PipelineStatus::*;
    let mut sm = StateMachine::new(Pending);
    for next in [Preparing, Running, Completing, Completed] {
        sm.transition_to(next).unwrap();
    }
    assert!(sm.is_terminal());
}

#[test]
fn zero_step_pipeline_completes_directly_from_preparing() {
    // Boundary case: a pipeline with zero steps goes PREPARING -> COMPLETED.
    let mut sm = StateMachine::new(PipelineStatus::Preparing);
    sm.transition_to(PipelineStatus::Completed).unwrap();
}

#[test]
fn failure_reachable_from_any_non_terminal_state() {
    use PipelineStatus::*;
    for start in [Pending, Preparing, Running, Completing] {
        let mut sm = StateMachine::new(start);
        sm.transition_to(Failed).unwrap();
    }
}

#[test]
fn cancellation_reachable_from_any_non_terminal_state() {
    use PipelineStatus::*;
    for start in [Pending, Preparing, Running, Completing] {
        let mut sm = StateMachine::new(start);
        sm.transition_to(Cancelled).unwrap();
    }
}

#[test]
fn terminal_statuses_never_transition() {
    use PipelineStatus::*;
    for terminal in [Completed, Failed, Cancelled] {
        let mut sm = StateMachine::new(terminal);
        assert!(sm.transition_to(Running).is_err());
    }
}
