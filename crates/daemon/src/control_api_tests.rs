// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use lazyaf_core::{RunId, StepExecutionStatus, StepId, StepRun};
use lazyaf_wire::{HeartbeatRequest, LogLineWire, LogStreamWire, LogsRequest, StatusRequest, StepStatusKind};

use super::*;
use crate::run_driver::tests::{script_step, test_context};

fn auth_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(axum::http::header::AUTHORIZATION, format!("Bearer {token}").parse().expect("header value"));
    headers
}

/// Inserts a `StepRun`/`StepExecution` pair as if `RunDriver::dispatch` had
/// just claimed them for a Remote step, returning `(execution_key, token)`.
fn seed_execution(ctx: &EngineContext, step_id: StepId) -> (String, String) {
    let run_id = RunId::new();
    let now = ctx.clock.epoch_ms();
    let step_run = StepRun::new(run_id, step_id, 0, "build".to_string());
    let step_run_id = ctx.gateway.insert_step_run(step_run).expect("insert step run");
    let (execution, claimed) = ctx.gateway.claim_execution(run_id, 0, step_run_id, 1, now).expect("claim execution");
    assert!(claimed);
    let token = ctx.tokens.mint(step_id, now, lazyaf_engine::DEFAULT_TTL_SECONDS);
    (execution.execution_key, token)
}

#[tokio::test]
async fn get_step_requires_a_bearer_token() {
    let ctx = test_context();
    let step = script_step("build");
    let (execution_key, _token) = seed_execution(&ctx, step.step_id);

    let err = get_step(State(ctx.clone()), HeaderMap::new(), Path(execution_key))
        .await
        .err()
        .expect("missing token rejected");
    assert_eq!(err.0.kind(), lazyaf_core::ErrorKind::Unauthorized);
}

#[tokio::test]
async fn get_step_rejects_a_token_scoped_to_a_different_step() {
    let ctx = test_context();
    let step = script_step("build");
    let (execution_key, _token) = seed_execution(&ctx, step.step_id);
    let wrong_token = ctx.tokens.mint(StepId::new(), ctx.clock.epoch_ms(), lazyaf_engine::DEFAULT_TTL_SECONDS);

    let err = get_step(State(ctx.clone()), auth_headers(&wrong_token), Path(execution_key))
        .await
        .err()
        .expect("mismatched token rejected");
    assert_eq!(err.0.kind(), lazyaf_core::ErrorKind::Forbidden);
}

#[tokio::test]
async fn get_step_returns_the_current_snapshot() {
    let ctx = test_context();
    let step = script_step("build");
    let (execution_key, token) = seed_execution(&ctx, step.step_id);

    let snapshot = get_step(State(ctx.clone()), auth_headers(&token), Path(execution_key))
        .await
        .expect("get step")
        .0;
    assert_eq!(snapshot.status, StepExecutionStatus::Pending.to_string());
    assert_eq!(snapshot.exit_code, None);
}

#[tokio::test]
async fn post_status_walks_pending_to_completed_and_finalizes_the_step_run() {
    let ctx = test_context();
    let step = script_step("build");
    let (execution_key, token) = seed_execution(&ctx, step.step_id);

    post_status(
        State(ctx.clone()),
        auth_headers(&token),
        Path(execution_key.clone()),
        axum::Json(StatusRequest { status: StepStatusKind::Running, exit_code: None, error: None, timestamp: 0 }),
    )
    .await
    .expect("running status");

    let execution = ctx.gateway.get_execution_by_key(&execution_key).expect("get execution");
    assert_eq!(execution.status, StepExecutionStatus::Running);

    post_status(
        State(ctx.clone()),
        auth_headers(&token),
        Path(execution_key.clone()),
        axum::Json(StatusRequest { status: StepStatusKind::Completed, exit_code: Some(0), error: None, timestamp: 0 }),
    )
    .await
    .expect("completed status");

    let execution = ctx.gateway.get_execution_by_key(&execution_key).expect("get execution");
    assert_eq!(execution.status, StepExecutionStatus::Completed);
    assert_eq!(execution.exit_code, Some(0));

    let step_run = ctx.gateway.get_step_run(execution.step_run_id).expect("get step run");
    assert_eq!(step_run.status, StepExecutionStatus::Completed);
    assert!(step_run.completed_at_ms.is_some());
}

#[tokio::test]
async fn post_status_failed_without_visiting_running_still_finalizes() {
    let ctx = test_context();
    let step = script_step("build");
    let (execution_key, token) = seed_execution(&ctx, step.step_id);

    post_status(
        State(ctx.clone()),
        auth_headers(&token),
        Path(execution_key.clone()),
        axum::Json(StatusRequest {
            status: StepStatusKind::Failed,
            exit_code: Some(1),
            error: Some("container crashed".to_string()),
            timestamp: 0,
        }),
    )
    .await
    .expect("failed status");

    let execution = ctx.gateway.get_execution_by_key(&execution_key).expect("get execution");
    assert_eq!(execution.status, StepExecutionStatus::Failed);
    assert_eq!(execution.error.as_deref(), Some("container crashed"));
}

#[tokio::test]
async fn post_logs_appends_lines_to_the_step_run() {
    let ctx = test_context();
    let step = script_step("build");
    let (execution_key, token) = seed_execution(&ctx, step.step_id);

    post_logs(
        State(ctx.clone()),
        auth_headers(&token),
        Path(execution_key.clone()),
        axum::Json(LogsRequest {
            lines: Some(vec![LogLineWire { content: "hello".to_string(), stream: LogStreamWire::Stdout, timestamp: 1 }]),
            ..Default::default()
        }),
    )
    .await
    .expect("post logs");

    let execution = ctx.gateway.get_execution_by_key(&execution_key).expect("get execution");
    let step_run = ctx.gateway.get_step_run(execution.step_run_id).expect("get step run");
    assert_eq!(step_run.logs.len(), 1);
    assert_eq!(step_run.logs[0].content, "hello");
}

#[tokio::test]
async fn post_heartbeat_extends_the_timeout_and_records_progress() {
    let ctx = test_context();
    let step = script_step("build");
    let (execution_key, token) = seed_execution(&ctx, step.step_id);

    post_heartbeat(
        State(ctx.clone()),
        auth_headers(&token),
        Path(execution_key.clone()),
        axum::Json(HeartbeatRequest {
            extend_seconds: Some(60),
            progress: Some(serde_json::json!({"percent": 50})),
            timestamp: 0,
        }),
    )
    .await
    .expect("post heartbeat");

    let execution = ctx.gateway.get_execution_by_key(&execution_key).expect("get execution");
    assert!(execution.last_heartbeat_ms.is_some());
    assert!(execution.timeout_at_ms.is_some());
    assert_eq!(execution.progress, Some(serde_json::json!({"percent": 50})));
}
