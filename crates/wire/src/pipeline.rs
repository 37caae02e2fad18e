// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin HTTP wire types: registering pipeline definitions and triggering
//! manual runs. `Pipeline`/`PipelineRun` themselves cross this boundary
//! unwrapped (`lazyaf-core` already derives `Serialize`/`Deserialize` on
//! them) — these types cover only the shapes `lazyaf-core` has no reason
//! to know about.

use serde::{Deserialize, Serialize};

/// `POST /api/pipelines/{pipeline_id}/trigger`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRunRequest {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub pin_commit: Option<String>,
    #[serde(default)]
    pub dedupe_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRunResponse {
    pub run_id: String,
}

/// `GET /api/pipeline-runs/{run_id}`: a read model flattening the run and
/// its step runs into one response so a UI doesn't need a second round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub pipeline_id: String,
    pub status: String,
    pub active_step_ids: Vec<String>,
    pub completed_step_ids: Vec<String>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub steps: Vec<StepRunSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRunSummary {
    pub step_run_id: String,
    pub step_id: String,
    pub name: String,
    pub status: String,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
