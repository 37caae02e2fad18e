// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

/// Proptest strategies for state-machine enums, shared by `lazyaf-core`'s own
/// transition-table tests and the downstream crates that build on them.
pub mod strategies {
    use proptest::prelude::*;

    use crate::debug_session::DebugState;
    use crate::pipeline_run::PipelineStatus;
    use crate::runner::RunnerState;
    use crate::step_execution::StepExecutionStatus;
    use crate::workspace::WorkspaceStatus;

    pub fn arb_step_execution_status() -> impl Strategy<Value = StepExecutionStatus> {
        prop_oneof![
            Just(StepExecutionStatus::Pending),
            Just(StepExecutionStatus::Assigned),
            Just(StepExecutionStatus::Preparing),
            Just(StepExecutionStatus::Running),
            Just(StepExecutionStatus::Completing),
            Just(StepExecutionStatus::Completed),
            Just(StepExecutionStatus::Failed),
            Just(StepExecutionStatus::Cancelled),
            Just(StepExecutionStatus::Timeout),
        ]
    }

    pub fn arb_pipeline_status() -> impl Strategy<Value = PipelineStatus> {
        prop_oneof![
            Just(PipelineStatus::Pending),
            Just(PipelineStatus::Preparing),
            Just(PipelineStatus::Running),
            Just(PipelineStatus::Completing),
            Just(PipelineStatus::Completed),
            Just(PipelineStatus::Failed),
            Just(PipelineStatus::Cancelled),
        ]
    }

    pub fn arb_workspace_status() -> impl Strategy<Value = WorkspaceStatus> {
        prop_oneof![
            Just(WorkspaceStatus::Creating),
            Just(WorkspaceStatus::Ready),
            Just(WorkspaceStatus::InUse),
            Just(WorkspaceStatus::Cleaning),
            Just(WorkspaceStatus::Failed),
            Just(WorkspaceStatus::Cleaned),
        ]
    }

    pub fn arb_runner_state() -> impl Strategy<Value = RunnerState> {
        prop_oneof![
            Just(RunnerState::Disconnected),
            Just(RunnerState::Connecting),
            Just(RunnerState::Idle),
            Just(RunnerState::Assigned),
            Just(RunnerState::Busy),
            Just(RunnerState::Dead),
        ]
    }

    pub fn arb_debug_state() -> impl Strategy<Value = DebugState> {
        prop_oneof![
            Just(DebugState::Pending),
            Just(DebugState::WaitingAtBreakpoint),
            Just(DebugState::Connected),
            Just(DebugState::Ended),
            Just(DebugState::Timeout),
        ]
    }
}

#[cfg(test)]
#[path = "test_support_tests.rs"]
mod tests;
