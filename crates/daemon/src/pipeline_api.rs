// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin HTTP API: register pipeline definitions, trigger manual runs, and
//! read back a run's current status. There is no separate CRUD service in
//! this single-binary deployment, so these routes are the one place a
//! `Pipeline` enters the system.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lazyaf_core::{Event, Pipeline, PipelineId, PipelineStatus, RunId, StateMachine, TriggerType};
use lazyaf_wire::{RunSummary, StepRunSummary, TriggerRunRequest, TriggerRunResponse};

use crate::context::EngineContext;
use crate::control_api::ApiError;
use crate::run_driver::RunDriver;

async fn register_pipeline(
    State(ctx): State<Arc<EngineContext>>,
    Json(pipeline): Json<Pipeline>,
) -> Result<Json<Pipeline>, ApiError> {
    Ok(Json(ctx.pipelines.register(pipeline)?))
}

async fn get_pipeline(
    State(ctx): State<Arc<EngineContext>>,
    Path(pipeline_id): Path<String>,
) -> Result<Json<Pipeline>, ApiError> {
    Ok(Json(ctx.pipelines.get(PipelineId::from_string(pipeline_id))?))
}

async fn list_pipelines(State(ctx): State<Arc<EngineContext>>) -> Json<Vec<Pipeline>> {
    Json(ctx.pipelines.list())
}

async fn trigger_run(
    State(ctx): State<Arc<EngineContext>>,
    Path(pipeline_id): Path<String>,
    Json(body): Json<TriggerRunRequest>,
) -> Result<Json<TriggerRunResponse>, ApiError> {
    let pipeline_id = PipelineId::from_string(pipeline_id);
    let pipeline = ctx.pipelines.get(pipeline_id)?;
    let trigger_type = match body.branch.clone() {
        Some(branch) => TriggerType::Push { branches: vec![branch] },
        None => TriggerType::Manual,
    };

    let driver = RunDriver::new(ctx.clone());
    let run_id = driver.start_run(pipeline.id, trigger_type, body.dedupe_key, body.pin_commit)?;
    Ok(Json(TriggerRunResponse { run_id: run_id.to_string() }))
}

fn to_summary(ctx: &EngineContext, run_id: RunId) -> Result<RunSummary, ApiError> {
    let run = ctx.gateway.get_pipeline_run(run_id)?;
    let steps = ctx
        .gateway
        .step_runs_for_run(run_id)
        .into_iter()
        .map(|sr| StepRunSummary {
            step_run_id: sr.id.to_string(),
            step_id: sr.step_id.to_string(),
            name: sr.name,
            status: sr.status.to_string(),
            started_at_ms: sr.started_at_ms,
            completed_at_ms: sr.completed_at_ms,
        })
        .collect();

    Ok(RunSummary {
        run_id: run.id.to_string(),
        pipeline_id: run.pipeline_id.to_string(),
        status: run.status.to_string(),
        active_step_ids: run.active_step_ids.iter().map(|id| id.to_string()).collect(),
        completed_step_ids: run.completed_step_ids.iter().map(|id| id.to_string()).collect(),
        started_at_ms: run.started_at_ms,
        completed_at_ms: run.completed_at_ms,
        steps,
    })
}

async fn get_run(
    State(ctx): State<Arc<EngineContext>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunSummary>, ApiError> {
    Ok(Json(to_summary(&ctx, RunId::from_string(run_id))?))
}

/// Transitions `run_id` to `CANCELLED` (a no-op if it's already terminal)
/// and broadcasts the status change. Shared with [`crate::debug_api`]'s
/// session abort, which cascades into the same cancellation.
pub(crate) fn cancel_pipeline_run(ctx: &EngineContext, run_id: RunId) -> lazyaf_core::EngineResult<()> {
    ctx.gateway.update_pipeline_run(run_id, |r| {
        if !r.status.is_terminal() {
            r.status = StateMachine::new(r.status).transition_to(PipelineStatus::Cancelled)?;
        }
        Ok(())
    })?;
    ctx.events.broadcast(Event::PipelineRunStatus { run_id, status: PipelineStatus::Cancelled });
    Ok(())
}

async fn cancel_run(
    State(ctx): State<Arc<EngineContext>>,
    Path(run_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    cancel_pipeline_run(&ctx, RunId::from_string(run_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<EngineContext>> {
    Router::new()
        .route("/api/pipelines", post(register_pipeline).get(list_pipelines))
        .route("/api/pipelines/:pipeline_id", get(get_pipeline))
        .route("/api/pipelines/:pipeline_id/trigger", post(trigger_run))
        .route("/api/pipeline-runs/:run_id", get(get_run))
        .route("/api/pipeline-runs/:run_id/cancel", post(cancel_run))
}

#[cfg(test)]
#[path = "pipeline_api_tests.rs"]
mod tests;
