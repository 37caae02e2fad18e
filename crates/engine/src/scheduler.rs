// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler: pure DAG-walk functions turning "a step
//! finished" into the next wave of work. Kept free of I/O so the fan-out
//! and edge-application rules are unit-testable without a gateway, container
//! orchestrator, or event bus in the loop — the same reasoning that keeps
//! [`crate::event_bus`] and the core `Effect` vocabulary pure.
//!
//! `next_steps` (the `Next` edge) names steps to continue *within the same
//! run* — the router still has to create their `StepRun`/claim their
//! `StepExecution` before it can emit `DispatchLocal`/`DispatchRemote`, so
//! the scheduler stops short of producing those effects itself. `Trigger`
//! and `Merge` edges are fully self-contained and do translate directly to
//! an `Effect`.

use std::collections::HashSet;

use lazyaf_core::{EdgeAction, Effect, Pipeline, RunId, StepId, WorkspaceId};

/// What to do next after a step completes.
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    /// Steps to start in the current run (from `Next` edges).
    pub next_steps: Vec<StepId>,
    /// Self-contained side effects (`Trigger`, `Merge`); empty for `Stop`.
    pub effects: Vec<Effect>,
}

/// Entry steps to start when a run transitions into `PREPARING`/`RUNNING`.
pub fn start_run(pipeline: &Pipeline) -> Vec<StepId> {
    pipeline.entry_steps()
}

/// Applies one step's completion edge:
/// - `Next` walks the DAG's derived successor edges (possibly several, for
///   fan-out) — returned as `next_steps` for the router to dispatch
/// - `Stop` ends this branch without scheduling anything further
/// - `Trigger { step_id }` enqueues a brand new pipeline subrun of that step,
///   regardless of DAG adjacency
/// - `Merge { branch }` asks the git collaborator to fast-forward `branch`
///   to the workspace HEAD, but only when the step succeeded — a `Merge`
///   wired to an `on_failure` edge never fires
pub fn on_step_completed(
    pipeline: &Pipeline,
    run_id: RunId,
    workspace_id: WorkspaceId,
    completed_step_id: StepId,
    succeeded: bool,
) -> ScheduleOutcome {
    let Some(step) = pipeline.step(completed_step_id) else {
        return ScheduleOutcome::default();
    };
    let action = if succeeded { &step.on_success } else { &step.on_failure };

    match action {
        EdgeAction::Stop => ScheduleOutcome::default(),
        EdgeAction::Trigger { step_id } => ScheduleOutcome {
            next_steps: Vec::new(),
            effects: vec![Effect::TriggerSubrun { from_run_id: run_id, step_id: *step_id }],
        },
        EdgeAction::Merge { branch } => ScheduleOutcome {
            next_steps: Vec::new(),
            effects: if succeeded { vec![Effect::FastForwardBranch { workspace_id, branch: branch.clone() }] } else { Vec::new() },
        },
        EdgeAction::Next => ScheduleOutcome {
            next_steps: pipeline.successors_of(completed_step_id).to_vec(),
            effects: Vec::new(),
        },
    }
}

/// Filters `candidates` (a step's raw `Next` successors) down to the ones
/// actually ready to schedule: a fan-in step only becomes ready once every
/// one of its structural predecessors is in `completed_step_ids` (spec
/// §4.11 step 3, exercised by §8 scenario 2).
pub fn ready_successors(
    pipeline: &Pipeline,
    completed_step_ids: &HashSet<StepId>,
    candidates: &[StepId],
) -> Vec<StepId> {
    candidates
        .iter()
        .copied()
        .filter(|step_id| pipeline.predecessors_of(*step_id).iter().all(|p| completed_step_ids.contains(p)))
        .collect()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
