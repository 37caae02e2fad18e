// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step control-plane HTTP API: the surface the control layer running as
//! PID 1 inside a step container talks to. Every route is scoped by
//! `execution_key` (the idempotency key a `StepExecution` is claimed under)
//! and authenticated with the `Bearer` token [`lazyaf_wire::StepConfig`]
//! wrote into the container at boot.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lazyaf_core::{EngineError, EngineResult, Event, ExecutionId, StepExecutionStatus};
use lazyaf_wire::{HeartbeatRequest, LogLineWire, LogStreamWire, LogsRequest, StatusRequest, StepSnapshot, StepStatusKind};

use crate::context::EngineContext;
use crate::run_driver::finalize_step_run;

pub(crate) struct ApiError(pub(crate) EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(lazyaf_wire::status_code(self.0.kind())).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.0.message().to_string()).into_response()
    }
}

/// Pulls the `Authorization: Bearer <token>` value, failing with
/// `Unauthorized` (401) if the header is absent or malformed rather than
/// `Forbidden` (403), which is reserved for a present-but-invalid token.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| EngineError::unauthorized("missing authorization header"))?;
    raw.strip_prefix("Bearer ")
        .ok_or_else(|| EngineError::unauthorized("authorization header is not a bearer token").into())
}

/// Resolves `execution_key` to its `StepExecution` and owning `StepRun`,
/// validating the bearer token against the step it was minted for.
fn authenticate(
    ctx: &EngineContext,
    headers: &HeaderMap,
    execution_key: &str,
) -> Result<(lazyaf_core::StepExecution, lazyaf_core::StepRun), ApiError> {
    let token = bearer_token(headers)?;
    let execution = ctx.gateway.get_execution_by_key(execution_key)?;
    let step_run = ctx.gateway.get_step_run(execution.step_run_id)?;
    ctx.tokens.validate(token, step_run.step_id, ctx.clock.epoch_ms())?;
    Ok((execution, step_run))
}

async fn get_step(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(execution_key): Path<String>,
) -> Result<Json<StepSnapshot>, ApiError> {
    let (execution, _step_run) = authenticate(&ctx, &headers, &execution_key)?;
    Ok(Json(StepSnapshot {
        execution_id: execution.id.to_string(),
        status: execution.status.to_string(),
        exit_code: execution.exit_code,
        error: execution.error,
        progress: execution.progress,
        last_heartbeat_ms: execution.last_heartbeat_ms,
        timeout_at_ms: execution.timeout_at_ms,
    }))
}

fn map_status(kind: StepStatusKind) -> StepExecutionStatus {
    match kind {
        StepStatusKind::Running => StepExecutionStatus::Running,
        StepStatusKind::Completed => StepExecutionStatus::Completed,
        StepStatusKind::Failed => StepExecutionStatus::Failed,
    }
}

/// Walks the `StepExecution` FSM's single linear pre-terminal line
/// (`Pending -> Assigned -> Preparing -> Running -> Completing`) forward
/// from wherever it currently sits up to `target`. A Remote runner's
/// control layer reports one status per call (`running`, then `completed`
/// or `failed`) rather than each intermediate stage `LocalExecutor` walks
/// through locally, and nothing else advances a Remote execution's status
/// between `claim_execution` and this handler.
pub(crate) fn advance_step_execution(
    ctx: &EngineContext,
    id: ExecutionId,
    target: StepExecutionStatus,
    exit_code: Option<i32>,
    error: Option<String>,
    now: u64,
) -> EngineResult<()> {
    loop {
        let current = ctx.gateway.get_step_execution(id)?.status;
        if current == target {
            return Ok(());
        }
        let next = match current {
            StepExecutionStatus::Pending => StepExecutionStatus::Assigned,
            StepExecutionStatus::Assigned => StepExecutionStatus::Preparing,
            StepExecutionStatus::Preparing => StepExecutionStatus::Running,
            StepExecutionStatus::Running => StepExecutionStatus::Completing,
            StepExecutionStatus::Completing => target,
            other => {
                return Err(EngineError::conflict(format!(
                    "execution {id} in terminal status {other:?} cannot advance to {target:?}"
                )))
            }
        };
        let (ec, err) = if next == target { (exit_code.clone(), error.clone()) } else { (None, None) };
        ctx.gateway.transition_step_execution(id, &[current], next, ec, err, now)?;
    }
}

async fn post_status(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(execution_key): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<StatusCode, ApiError> {
    let (execution, step_run) = authenticate(&ctx, &headers, &execution_key)?;
    let new_status = map_status(body.status);
    let now = ctx.clock.epoch_ms();

    advance_step_execution(&ctx, execution.id, new_status, body.exit_code, body.error.clone(), now)?;

    if new_status.is_terminal() {
        finalize_step_run(&ctx, step_run.pipeline_run_id, step_run.id, execution.id, new_status, body.error)?;
    } else {
        ctx.gateway.update_step_run(step_run.id, |sr| {
            sr.status = new_status;
            Ok(())
        })?;
        ctx.events.broadcast(Event::StepRunStatus {
            run_id: step_run.pipeline_run_id,
            step_run_id: step_run.id,
            execution_id: execution.id,
            status: new_status,
        });
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn to_core_line(line: LogLineWire) -> lazyaf_core::LogLine {
    lazyaf_core::LogLine {
        content: line.content,
        stream: match line.stream {
            LogStreamWire::Stdout => lazyaf_core::LogStream::Stdout,
            LogStreamWire::Stderr => lazyaf_core::LogStream::Stderr,
        },
        timestamp_ms: line.timestamp,
    }
}

async fn post_logs(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(execution_key): Path<String>,
    Json(body): Json<LogsRequest>,
) -> Result<StatusCode, ApiError> {
    let (_execution, step_run) = authenticate(&ctx, &headers, &execution_key)?;
    let lines: Vec<lazyaf_core::LogLine> = body.into_lines().into_iter().map(to_core_line).collect();
    if lines.is_empty() {
        return Ok(StatusCode::NO_CONTENT);
    }

    ctx.gateway.update_step_run(step_run.id, |sr| {
        sr.append_logs(lines.clone());
        Ok(())
    })?;
    ctx.events.broadcast(Event::StepLogs { step_run_id: step_run.id, lines });
    Ok(StatusCode::NO_CONTENT)
}

async fn post_heartbeat(
    State(ctx): State<Arc<EngineContext>>,
    headers: HeaderMap,
    Path(execution_key): Path<String>,
    Json(body): Json<HeartbeatRequest>,
) -> Result<StatusCode, ApiError> {
    let (execution, _step_run) = authenticate(&ctx, &headers, &execution_key)?;
    let now = ctx.clock.epoch_ms();
    ctx.gateway.update_step_execution(execution.id, |exec| {
        exec.last_heartbeat_ms = Some(now);
        if body.progress.is_some() {
            exec.progress = body.progress.clone();
        }
        if let Some(extend) = body.extend_seconds {
            exec.timeout_at_ms = Some(now + extend * 1000);
        }
        Ok(())
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<EngineContext>> {
    Router::new()
        .route("/api/steps/:execution_key", get(get_step))
        .route("/api/steps/:execution_key/status", post(post_status))
        .route("/api/steps/:execution_key/logs", post(post_logs))
        .route("/api/steps/:execution_key/heartbeat", post(post_heartbeat))
}

#[cfg(test)]
#[path = "control_api_tests.rs"]
mod tests;
