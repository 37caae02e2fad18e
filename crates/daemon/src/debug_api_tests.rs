// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use lazyaf_core::{DebugState, Pipeline, PipelineId, RepositoryId, TriggerType};
use lazyaf_wire::{DebugRerunRequest, ExtendQuery};

use super::*;
use crate::run_driver::tests::{script_step, test_context, wait_until};

fn auth_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(axum::http::header::AUTHORIZATION, format!("Bearer {token}").parse().expect("header value"));
    headers
}

fn seed_pipeline(ctx: &EngineContext) -> lazyaf_core::RunId {
    let pipeline = Pipeline::new(PipelineId::new(), RepositoryId::new(), vec![script_step("build")], Vec::new());
    let pipeline_id = pipeline.id;
    ctx.pipelines.register(pipeline).expect("register pipeline");

    let run = lazyaf_core::PipelineRun::new(pipeline_id, TriggerType::Manual, ctx.clock.epoch_ms());
    let run_id = run.id;
    ctx.gateway.insert_pipeline_run(run).expect("insert original run");
    run_id
}

#[tokio::test]
async fn post_debug_rerun_forks_a_new_run_and_arms_the_breakpoint() {
    let ctx = test_context();
    let original_run_id = seed_pipeline(&ctx);

    let response = post_debug_rerun(
        State(ctx.clone()),
        Path(original_run_id.to_string()),
        axum::Json(DebugRerunRequest { breakpoints: vec![0], commit: None, branch: None }),
    )
    .await
    .expect("debug rerun")
    .0;

    assert_ne!(response.run_id, original_run_id.to_string());

    let session_id = lazyaf_core::DebugSessionId::from_string(response.debug_session_id.clone());
    wait_until(|| {
        ctx.gateway
            .get_debug_session(session_id)
            .map(|s| s.status == DebugState::WaitingAtBreakpoint)
            .unwrap_or(false)
    })
    .await;
}

#[tokio::test]
async fn get_debug_session_requires_a_bearer_token() {
    let ctx = test_context();
    let original_run_id = seed_pipeline(&ctx);
    let response = post_debug_rerun(
        State(ctx.clone()),
        Path(original_run_id.to_string()),
        axum::Json(DebugRerunRequest { breakpoints: vec![0], commit: None, branch: None }),
    )
    .await
    .expect("debug rerun")
    .0;

    let err = get_debug_session(State(ctx.clone()), HeaderMap::new(), Path(response.debug_session_id))
        .await
        .err()
        .expect("missing token rejected");
    assert_eq!(err.0.kind(), lazyaf_core::ErrorKind::Unauthorized);
}

#[tokio::test]
async fn get_debug_session_rejects_the_wrong_token() {
    let ctx = test_context();
    let original_run_id = seed_pipeline(&ctx);
    let response = post_debug_rerun(
        State(ctx.clone()),
        Path(original_run_id.to_string()),
        axum::Json(DebugRerunRequest { breakpoints: vec![0], commit: None, branch: None }),
    )
    .await
    .expect("debug rerun")
    .0;

    let err = get_debug_session(State(ctx.clone()), auth_headers("not-the-token"), Path(response.debug_session_id))
        .await
        .err()
        .expect("wrong token rejected");
    assert_eq!(err.0.kind(), lazyaf_core::ErrorKind::Forbidden);
}

#[tokio::test]
async fn post_resume_wakes_the_breakpoint_and_lets_the_run_complete() {
    let ctx = test_context();
    let original_run_id = seed_pipeline(&ctx);
    let response = post_debug_rerun(
        State(ctx.clone()),
        Path(original_run_id.to_string()),
        axum::Json(DebugRerunRequest { breakpoints: vec![0], commit: None, branch: None }),
    )
    .await
    .expect("debug rerun")
    .0;

    let session_id = lazyaf_core::DebugSessionId::from_string(response.debug_session_id.clone());
    wait_until(|| {
        ctx.gateway
            .get_debug_session(session_id)
            .map(|s| s.status == DebugState::WaitingAtBreakpoint)
            .unwrap_or(false)
    })
    .await;

    post_resume(State(ctx.clone()), auth_headers(&response.token), Path(response.debug_session_id))
        .await
        .expect("resume");

    let run_id = lazyaf_core::RunId::from_string(response.run_id);
    wait_until(|| {
        ctx.gateway
            .get_pipeline_run(run_id)
            .map(|r| r.status.is_terminal())
            .unwrap_or(false)
    })
    .await;
    let run = ctx.gateway.get_pipeline_run(run_id).expect("get run");
    assert_eq!(run.status, lazyaf_core::PipelineStatus::Completed);
}

#[tokio::test]
async fn post_abort_ends_the_session_and_cancels_the_run() {
    let ctx = test_context();
    let original_run_id = seed_pipeline(&ctx);
    let response = post_debug_rerun(
        State(ctx.clone()),
        Path(original_run_id.to_string()),
        axum::Json(DebugRerunRequest { breakpoints: vec![0], commit: None, branch: None }),
    )
    .await
    .expect("debug rerun")
    .0;

    let session_id = lazyaf_core::DebugSessionId::from_string(response.debug_session_id.clone());
    wait_until(|| {
        ctx.gateway
            .get_debug_session(session_id)
            .map(|s| s.status == DebugState::WaitingAtBreakpoint)
            .unwrap_or(false)
    })
    .await;

    post_abort(State(ctx.clone()), auth_headers(&response.token), Path(response.debug_session_id))
        .await
        .expect("abort");

    let session = ctx.gateway.get_debug_session(session_id).expect("get session");
    assert_eq!(session.status, DebugState::Ended);

    let run_id = lazyaf_core::RunId::from_string(response.run_id);
    wait_until(|| {
        ctx.gateway
            .get_pipeline_run(run_id)
            .map(|r| r.status.is_terminal())
            .unwrap_or(false)
    })
    .await;
    let run = ctx.gateway.get_pipeline_run(run_id).expect("get run");
    assert_eq!(run.status, lazyaf_core::PipelineStatus::Cancelled);
}

#[tokio::test]
async fn post_extend_rejects_an_out_of_range_value() {
    let ctx = test_context();
    let original_run_id = seed_pipeline(&ctx);
    let response = post_debug_rerun(
        State(ctx.clone()),
        Path(original_run_id.to_string()),
        axum::Json(DebugRerunRequest { breakpoints: vec![0], commit: None, branch: None }),
    )
    .await
    .expect("debug rerun")
    .0;

    let err = post_extend(
        State(ctx.clone()),
        auth_headers(&response.token),
        Path(response.debug_session_id),
        Query(ExtendQuery { additional_minutes: 0 }),
    )
    .await
    .err()
    .expect("out-of-range rejected");
    assert_eq!(err.0.kind(), lazyaf_core::ErrorKind::Protocol);
}
