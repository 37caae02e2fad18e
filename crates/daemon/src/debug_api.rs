// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debug session HTTP API: start a breakpointed rerun of a pipeline run,
//! inspect a live session, and drive it past a breakpoint (or end it)
//! without an interactive terminal attach. The terminal WS itself lives in
//! [`crate::debug_ws`].

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use lazyaf_core::{DebugSession, DebugSessionId, EngineError, RunId};
use lazyaf_wire::{DebugRerunRequest, DebugRerunResponse, DebugSessionInfo, ExtendQuery};

use crate::context::EngineContext;
use crate::control_api::{bearer_token, ApiError};
use crate::pipeline_api::cancel_pipeline_run;
use crate::run_driver::RunDriver;

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authenticate(ctx: &EngineContext, headers: &HeaderMap, session_id: DebugSessionId) -> Result<DebugSession, ApiError> {
    let token = bearer_token(headers)?;
    let session = ctx.gateway.get_debug_session(session_id)?;
    if !constant_time_eq(session.token.as_bytes(), token.as_bytes()) {
        return Err(EngineError::forbidden("invalid debug session token").into());
    }
    Ok(session)
}

fn to_info(session: &DebugSession) -> DebugSessionInfo {
    DebugSessionInfo {
        session_id: session.id.to_string(),
        pipeline_run_id: session.pipeline_run_id.to_string(),
        status: session.status.to_string(),
        breakpoints: session.breakpoints.iter().copied().collect(),
        current_step_index: session.current_step_index,
        connection_mode: session.connection_mode.map(|m| match m {
            lazyaf_core::ConnectionMode::Sidecar => "sidecar".to_string(),
            lazyaf_core::ConnectionMode::Shell => "shell".to_string(),
        }),
        expires_at_ms: session.expires_at_ms,
    }
}

async fn post_debug_rerun(
    State(ctx): State<Arc<EngineContext>>,
    Path(run_id): Path<String>,
    Json(body): Json<DebugRerunRequest>,
) -> Result<Json<DebugRerunResponse>, ApiError> {
    let run_id = RunId::from_string(run_id);
    let original_run = ctx.gateway.get_pipeline_run(run_id)?;
    let pipeline = ctx.pipelines.get(original_run.pipeline_id)?;

    let token = nanoid::nanoid!(32);
    let breakpoints: HashSet<u32> = body.breakpoints.into_iter().collect();
    let (run, session) = ctx.debug.create_debug_rerun(
        &original_run,
        breakpoints,
        token.clone(),
        ctx.config.debug_default_timeout_s,
        ctx.config.debug_max_timeout_s,
    )?;

    let branch = body
        .branch
        .unwrap_or_else(|| RunDriver::default_branch(&original_run.trigger_type));
    RunDriver::new(ctx.clone()).resume_existing_run(run.id, pipeline, branch, body.commit);

    Ok(Json(DebugRerunResponse { run_id: run.id.to_string(), debug_session_id: session.id.to_string(), token }))
}

async fn get_debug_session(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<DebugSessionInfo>, ApiError> {
    let session = authenticate(&ctx, &headers, DebugSessionId::from_string(session_id))?;
    Ok(Json(to_info(&session)))
}

async fn post_resume(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = DebugSessionId::from_string(session_id);
    authenticate(&ctx, &headers, session_id)?;
    ctx.debug.resume(session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn post_abort(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = DebugSessionId::from_string(session_id);
    let session = authenticate(&ctx, &headers, session_id)?;
    cancel_pipeline_run(&ctx, session.pipeline_run_id)?;
    ctx.debug.abort(session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn post_extend(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Query(query): Query<ExtendQuery>,
) -> Result<Json<DebugSessionInfo>, ApiError> {
    let session_id = DebugSessionId::from_string(session_id);
    authenticate(&ctx, &headers, session_id)?;
    if !(1..=180).contains(&query.additional_minutes) {
        return Err(EngineError::new(lazyaf_core::ErrorKind::Protocol, "additional_minutes must be between 1 and 180").into());
    }
    let session = ctx.debug.extend_timeout(session_id, u64::from(query.additional_minutes) * 60)?;
    Ok(Json(to_info(&session)))
}

pub fn router() -> Router<Arc<EngineContext>> {
    Router::new()
        .route("/api/pipeline-runs/:run_id/debug-rerun", post(post_debug_rerun))
        .route("/api/debug/:session_id", get(get_debug_session))
        .route("/api/debug/:session_id/resume", post(post_resume))
        .route("/api/debug/:session_id/abort", post(post_abort))
        .route("/api/debug/:session_id/extend", post(post_extend))
}

#[cfg(test)]
#[path = "debug_api_tests.rs"]
mod tests;
