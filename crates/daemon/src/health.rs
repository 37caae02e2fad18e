// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/healthz` and `/metrics`: the ambient observability surface every
//! route in this binary sits behind. `/healthz` mirrors the teacher's own
//! status-overview query (`uptime` from an `Instant` captured at startup,
//! plus live counts) collapsed to the single boolean a load balancer
//! actually probes; `/metrics` exposes the same counts in the plain-text
//! exposition format scrapers expect, written by hand since the gauge set
//! here is small enough that a dedicated crate would outweigh what it buys.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::context::EngineContext;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    uptime_seconds: u64,
    active_runners: usize,
    registered_pipelines: usize,
    subscribers: usize,
}

async fn healthz(State(ctx): State<Arc<EngineContext>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        uptime_seconds: ctx.start_time.elapsed().as_secs(),
        active_runners: ctx.gateway.list_runners().len(),
        registered_pipelines: ctx.pipelines.list().len(),
        subscribers: ctx.events.subscriber_count(),
    })
}

async fn metrics(State(ctx): State<Arc<EngineContext>>) -> impl IntoResponse {
    let runners = ctx.gateway.list_runners();
    let idle = runners.iter().filter(|r| r.status == lazyaf_core::RunnerState::Idle).count();
    let busy = runners.iter().filter(|r| r.status == lazyaf_core::RunnerState::Busy).count();
    let non_terminal_executions = ctx.gateway.non_terminal_executions().len();
    let active_debug_sessions = ctx.gateway.active_debug_sessions().len();

    let mut body = String::new();
    let _ = writeln!(body, "# HELP lazyaf_uptime_seconds Seconds since the daemon started.");
    let _ = writeln!(body, "# TYPE lazyaf_uptime_seconds gauge");
    let _ = writeln!(body, "lazyaf_uptime_seconds {}", ctx.start_time.elapsed().as_secs());

    let _ = writeln!(body, "# HELP lazyaf_runners Runners currently registered, by status.");
    let _ = writeln!(body, "# TYPE lazyaf_runners gauge");
    let _ = writeln!(body, r#"lazyaf_runners{{status="idle"}} {idle}"#);
    let _ = writeln!(body, r#"lazyaf_runners{{status="busy"}} {busy}"#);
    let _ = writeln!(body, r#"lazyaf_runners{{status="total"}} {}"#, runners.len());

    let _ = writeln!(body, "# HELP lazyaf_non_terminal_executions Step executions not yet in a terminal state.");
    let _ = writeln!(body, "# TYPE lazyaf_non_terminal_executions gauge");
    let _ = writeln!(body, "lazyaf_non_terminal_executions {non_terminal_executions}");

    let _ = writeln!(body, "# HELP lazyaf_active_debug_sessions Debug sessions not yet ended or timed out.");
    let _ = writeln!(body, "# TYPE lazyaf_active_debug_sessions gauge");
    let _ = writeln!(body, "lazyaf_active_debug_sessions {active_debug_sessions}");

    let _ = writeln!(body, "# HELP lazyaf_event_subscribers Live subscribers on the Event Bus.");
    let _ = writeln!(body, "# TYPE lazyaf_event_subscribers gauge");
    let _ = writeln!(body, "lazyaf_event_subscribers {}", ctx.events.subscriber_count());

    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

pub fn router() -> Router<Arc<EngineContext>> {
    Router::new().route("/healthz", get(healthz)).route("/metrics", get(metrics))
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
