// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Pipeline` and its step DAG. Owned by the external CRUD layer;
//! the engine only reads it. Dynamic config blobs (`type_config`,
//! `on_success`/`on_failure`, `triggers`) are lifted to tagged enums
//! validated at ingress rather than passed around as raw JSON.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ids::{PipelineId, RepositoryId, StepId};

/// What a step actually runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepType {
    Script { command: String },
    Container { image: String, command: Option<String> },
    Agent { runner_type: String, agent_config: serde_json::Value },
}

impl StepType {
    pub fn is_agent(&self) -> bool {
        matches!(self, StepType::Agent { .. })
    }
}

/// What happens to the DAG walk when a step finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EdgeAction {
    Next,
    Stop,
    Trigger { step_id: StepId },
    Merge { branch: String },
}

/// Hardware/capability requirements a step places on a runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub hardware: Vec<String>,
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        self.hardware.is_empty()
    }
}

/// One node of the pipeline DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub step_id: StepId,
    pub name: String,
    #[serde(flatten)]
    pub step_type: StepType,
    pub on_success: EdgeAction,
    pub on_failure: EdgeAction,
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub continue_in_context: bool,
    pub required_runner_id: Option<String>,
    #[serde(default)]
    pub requires: Requirements,
    /// Structural DAG edges: the steps made reachable when this step's
    /// `on_success` resolves to `Next`. A step with more than one entry here
    /// is a fan-out node (§8 scenario 2); a step named here by more than one
    /// predecessor is a fan-in node and only becomes ready once every
    /// predecessor has completed (see [`Pipeline::predecessors_of`]).
    #[serde(default)]
    pub successors: Vec<StepId>,
}

/// Which trigger kinds are armed for a pipeline, and their per-kind
/// configuration (e.g. which branches a push trigger watches).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    Push { branches: Vec<String> },
    CardComplete { status: String },
    Manual,
}

/// A pipeline definition: a DAG of [`StepDef`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub repo_id: RepositoryId,
    pub steps: Vec<StepDef>,
    pub triggers: Vec<TriggerConfig>,
}

impl Pipeline {
    /// Constructs a pipeline from its steps, each already carrying its
    /// `successors` DAG edges. Does not validate; call [`Pipeline::validate`]
    /// before scheduling.
    pub fn new(id: PipelineId, repo_id: RepositoryId, steps: Vec<StepDef>, triggers: Vec<TriggerConfig>) -> Self {
        Self { id, repo_id, steps, triggers }
    }

    pub fn step(&self, step_id: StepId) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Predecessors of `step_id`: every step whose `successors` names it.
    /// A fan-in step becomes ready only once all of these have completed.
    pub fn predecessors_of(&self, step_id: StepId) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|s| s.successors.contains(&step_id))
            .map(|s| s.step_id)
            .collect()
    }

    pub fn entry_steps(&self) -> Vec<StepId> {
        let targets: HashSet<StepId> = self.steps.iter().flat_map(|s| s.successors.iter().copied()).collect();
        self.steps.iter().map(|s| s.step_id).filter(|id| !targets.contains(id)).collect()
    }

    /// Successors made ready by `step_id` completing.
    pub fn successors_of(&self, step_id: StepId) -> &[StepId] {
        self.step(step_id).map(|s| s.successors.as_slice()).unwrap_or(&[])
    }

    /// Structural invariants: acyclic, exactly one entry node,
    /// every non-terminal edge target exists.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.steps.is_empty() {
            return Ok(());
        }

        let ids: HashSet<StepId> = self.steps.iter().map(|s| s.step_id).collect();
        if ids.len() != self.steps.len() {
            return Err(EngineError::fatal("duplicate step_id in pipeline"));
        }

        for step in &self.steps {
            for edge in [&step.on_success, &step.on_failure] {
                if let EdgeAction::Trigger { step_id } = edge {
                    if !ids.contains(step_id) {
                        return Err(EngineError::fatal(format!(
                            "step {} references unknown trigger target {step_id}",
                            step.step_id
                        )));
                    }
                }
            }
        }

        let entries = self.entry_steps();
        if entries.len() != 1 {
            return Err(EngineError::fatal(format!(
                "pipeline must have exactly one entry node, found {}",
                entries.len()
            )));
        }

        self.check_acyclic()
    }

    fn check_acyclic(&self) -> Result<(), EngineError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: HashMap<StepId, Mark> = HashMap::new();

        fn visit(
            pipeline: &Pipeline,
            id: StepId,
            marks: &mut HashMap<StepId, Mark>,
        ) -> Result<(), EngineError> {
            match marks.get(&id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(EngineError::fatal(format!("cycle detected at step {id}")))
                }
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            for succ in pipeline.successors_of(id) {
                visit(pipeline, *succ, marks)?;
            }
            marks.insert(id, Mark::Done);
            Ok(())
        }

        for step in &self.steps {
            visit(self, step.step_id, &mut marks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
