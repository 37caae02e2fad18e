// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws/runner`: the long-lived WebSocket a runner process holds open
//! for its whole connected lifetime. Registration, ack/heartbeat, log
//! forwarding and step completion all flow over this one socket; dispatch
//! itself (`ExecuteStep`, `Abort`) flows the other way through
//! [`crate::runner_transport::WsRunnerTransport`].

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use lazyaf_core::{ExecutionId, Runner, RunnerId, RunnerType, StepExecution, StepExecutionStatus};
use lazyaf_wire::{BackendMessage, RunnerMessage, WsCloseCode};

use crate::context::EngineContext;
use crate::control_api::{advance_step_execution, to_core_line};
use crate::run_driver::finalize_step_run;

async fn upgrade(State(ctx): State<Arc<EngineContext>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

fn as_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text),
        _ => None,
    }
}

fn parse_runner_type(raw: &str) -> RunnerType {
    match raw {
        "claude_code" => RunnerType::ClaudeCode,
        "gemini" => RunnerType::Gemini,
        "any" => RunnerType::Any,
        other => RunnerType::Generic(other.to_string()),
    }
}

/// Registers or reconnects the runner that just sent the first frame on a
/// freshly accepted socket. A supplied `runner_id` the gateway still knows
/// about is a reconnect (`reconcile_reconnect`, preserving whatever
/// execution it was holding); anything else is a brand-new runner.
async fn admit_runner(
    ctx: &EngineContext,
    runner_id: Option<String>,
    name: String,
    runner_type: RunnerType,
    labels: std::collections::HashMap<String, String>,
) -> Option<Runner> {
    if let Some(id) = runner_id.map(RunnerId::from_string) {
        if ctx.gateway.get_runner(id).is_ok() {
            ctx.runners.reconcile_reconnect(id, None).await.ok()?;
            return ctx
                .gateway
                .update_runner(id, |r| {
                    r.name = name.clone();
                    r.runner_type = runner_type.clone();
                    r.labels = labels.clone();
                    Ok(r.clone())
                })
                .ok();
        }
    }
    let mut fresh = Runner::new(name, runner_type);
    fresh.labels = labels;
    ctx.runners.register(fresh).ok()
}

async fn close_with(mut sink: impl SinkExt<Message, Error = axum::Error> + Unpin, code: WsCloseCode, reason: &'static str) {
    let _ = sink
        .send(Message::Close(Some(CloseFrame { code: code.code(), reason: reason.into() })))
        .await;
}

async fn handle_socket(socket: WebSocket, ctx: Arc<EngineContext>) {
    let (mut sink, mut stream) = socket.split();
    let registration_timeout = Duration::from_secs(ctx.config.registration_timeout_s);

    let Ok(Some(Ok(first))) = tokio::time::timeout(registration_timeout, stream.next()).await else {
        close_with(sink, WsCloseCode::BadRegistration, "registration timed out").await;
        return;
    };
    let Some(text) = as_text(first) else {
        close_with(sink, WsCloseCode::BadRegistration, "first frame must be text").await;
        return;
    };
    let Ok(RunnerMessage::Register { runner_id, name, runner_type, labels }) = serde_json::from_str::<RunnerMessage>(&text) else {
        close_with(sink, WsCloseCode::BadRegistration, "first frame must be Register").await;
        return;
    };

    let labels: std::collections::HashMap<String, String> = labels.into_iter().collect();
    let Some(runner) = admit_runner(&ctx, runner_id, name, parse_runner_type(&runner_type), labels).await else {
        close_with(sink, WsCloseCode::IllegalState, "registration rejected").await;
        return;
    };
    let runner_id = runner.id;

    let rx = ctx.transport.register(runner_id);
    tokio::spawn(crate::runner_transport::forward_to_socket(sink, rx));

    if ctx
        .transport
        .send(runner_id, BackendMessage::Registered { runner_id: runner_id.to_string() })
        .is_err()
    {
        ctx.transport.unregister(runner_id);
        return;
    }

    while let Some(Ok(frame)) = stream.next().await {
        let Some(text) = as_text(frame) else { continue };
        let Ok(message) = serde_json::from_str::<RunnerMessage>(&text) else {
            let _ = ctx.transport.send(runner_id, BackendMessage::Error { message: "malformed frame".to_string() });
            continue;
        };
        match message {
            RunnerMessage::Register { .. } => {
                let _ = ctx
                    .transport
                    .send(runner_id, BackendMessage::Error { message: "already registered".to_string() });
            }
            RunnerMessage::Ack { .. } => {
                if let Err(e) = ctx.runners.ack(runner_id) {
                    tracing::warn!(error = %e, %runner_id, "ack failed");
                }
            }
            RunnerMessage::Heartbeat => {
                let _ = ctx.runners.heartbeat(runner_id);
                let _ = ctx.transport.send(runner_id, BackendMessage::Pong);
            }
            RunnerMessage::Log { step_id: _, lines } => {
                handle_log(&ctx, runner_id, lines);
            }
            RunnerMessage::StepComplete { step_id: _, exit_code, error } => {
                handle_step_complete(&ctx, runner_id, exit_code, error);
            }
        }
    }

    if let Ok(Some(execution_id)) = ctx.runners.on_disconnect(runner_id) {
        tracing::info!(%runner_id, %execution_id, "runner disconnected while holding an execution");
    }
    ctx.transport.unregister(runner_id);
}

fn active_execution(ctx: &EngineContext, runner_id: RunnerId) -> Option<ExecutionId> {
    ctx.gateway.get_runner(runner_id).ok()?.current_step_execution_id
}

fn handle_log(ctx: &EngineContext, runner_id: RunnerId, lines: Vec<lazyaf_wire::LogLineWire>) {
    let Some(execution_id) = active_execution(ctx, runner_id) else { return };
    let Ok(execution) = ctx.gateway.get_step_execution(execution_id) else { return };
    let lines: Vec<lazyaf_core::LogLine> = lines.into_iter().map(to_core_line).collect();
    if lines.is_empty() {
        return;
    }
    if ctx
        .gateway
        .update_step_run(execution.step_run_id, |sr| {
            sr.append_logs(lines.clone());
            Ok(())
        })
        .is_err()
    {
        return;
    }
    ctx.events.broadcast(lazyaf_core::Event::StepLogs { step_run_id: execution.step_run_id, lines });
}

fn handle_step_complete(ctx: &EngineContext, runner_id: RunnerId, exit_code: i32, error: Option<String>) {
    let Some(execution_id) = active_execution(ctx, runner_id) else { return };
    let Ok(execution) = ctx.gateway.get_step_execution(execution_id) else { return };
    let Ok(step_run) = ctx.gateway.get_step_run(execution.step_run_id) else { return };

    let target = if error.is_some() { StepExecutionStatus::Failed } else { StepExecution::outcome_status(exit_code) };
    let now = ctx.clock.epoch_ms();
    if advance_step_execution(ctx, execution_id, target, Some(exit_code), error.clone(), now).is_err() {
        return;
    }
    let _ = finalize_step_run(ctx, step_run.pipeline_run_id, step_run.id, execution_id, target, error);
    let _ = ctx.runners.complete(runner_id);
}

pub fn router() -> Router<Arc<EngineContext>> {
    Router::new().route("/ws/runner", get(upgrade))
}
