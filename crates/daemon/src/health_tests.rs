// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::extract::State;

use super::*;
use crate::run_driver::tests::test_context;

#[tokio::test]
async fn healthz_reports_ok_with_zero_counts_on_a_fresh_context() {
    let ctx = test_context();
    let health = healthz(State(ctx)).await.0;
    assert_eq!(health.status, "ok");
    assert_eq!(health.active_runners, 0);
    assert_eq!(health.registered_pipelines, 0);
}

#[tokio::test]
async fn metrics_reports_plain_text_gauges() {
    let ctx = test_context();
    let pipeline = lazyaf_core::Pipeline::new(
        lazyaf_core::PipelineId::new(),
        lazyaf_core::RepositoryId::new(),
        vec![crate::run_driver::tests::script_step("build")],
        Vec::new(),
    );
    ctx.pipelines.register(pipeline).expect("register");

    let response = metrics(State(ctx)).await.into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let text = String::from_utf8(body.to_vec()).expect("utf8 body");
    assert!(text.contains("lazyaf_uptime_seconds"));
    assert!(text.contains(r#"lazyaf_runners{status="total"} 0"#));
}
