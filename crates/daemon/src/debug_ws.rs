// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /api/debug/{session_id}/terminal?mode=sidecar|shell&token=...`: an
//! interactive shell bridged over WebSocket, either into the currently
//! breakpointed step's own container (`shell`) or into a throwaway
//! container mounting the same workspace volume (`sidecar`). Shells out to
//! `docker exec`/`docker run` directly, the same CLI idiom [`crate::docker`]
//! uses for everything else, since an interactive attach needs piped
//! stdio a detached [`lazyaf_engine::ContainerOrchestrator::exec`] can't give it.

use std::process::Stdio;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use lazyaf_core::{ConnectionMode, DebugSession, DebugSessionId, EngineError, EngineResult};
use lazyaf_wire::{TerminalCommand, TerminalMode};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::context::EngineContext;

#[derive(Deserialize)]
struct TerminalQuery {
    mode: TerminalMode,
    token: String,
}

fn to_connection_mode(mode: TerminalMode) -> ConnectionMode {
    match mode {
        TerminalMode::Sidecar => ConnectionMode::Sidecar,
        TerminalMode::Shell => ConnectionMode::Shell,
    }
}

async fn launch_sidecar(volume_name: &str) -> EngineResult<String> {
    let docker_bin = crate::config::docker_bin();
    let output = tokio::process::Command::new(&docker_bin)
        .args(["run", "-d", "--rm", "-v", &format!("{volume_name}:/workspace"), "-w", "/workspace", "alpine:3.19", "sleep", "infinity"])
        .output()
        .await
        .map_err(|e| EngineError::transient(format!("failed to launch debug sidecar: {e}")))?;
    if !output.status.success() {
        return Err(EngineError::transient(format!("docker run failed: {}", String::from_utf8_lossy(&output.stderr))));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Resolves the container to `docker exec` into: the step's own container
/// for `shell` mode, or a lazily-created sidecar for `sidecar` mode.
async fn resolve_container(ctx: &EngineContext, session: &DebugSession, mode: TerminalMode) -> EngineResult<String> {
    match mode {
        TerminalMode::Shell => {
            let step_index = session
                .current_step_index
                .ok_or_else(|| EngineError::conflict("debug session is not paused at a breakpoint"))?;
            let step_run = ctx
                .gateway
                .step_runs_for_run(session.pipeline_run_id)
                .into_iter()
                .find(|sr| sr.step_index == step_index)
                .ok_or_else(|| EngineError::not_found("no step run at the current breakpoint"))?;
            let execution = ctx
                .gateway
                .executions_for_step_run(step_run.id)
                .into_iter()
                .last()
                .ok_or_else(|| EngineError::not_found("no execution recorded for the breakpointed step"))?;
            execution.container_id.ok_or_else(|| EngineError::conflict("step execution has no container yet"))
        }
        TerminalMode::Sidecar => {
            if let Some(id) = &session.sidecar_container_id {
                return Ok(id.clone());
            }
            let workspace = ctx.gateway.get_workspace_for_run(session.pipeline_run_id)?;
            let container_id = launch_sidecar(&workspace.volume_name).await?;
            ctx.gateway.update_debug_session(session.id, |s| {
                s.sidecar_container_id = Some(container_id.clone());
                Ok(())
            })?;
            Ok(container_id)
        }
    }
}

async fn upgrade(
    State(ctx): State<Arc<EngineContext>>,
    Path(session_id): Path<String>,
    Query(query): Query<TerminalQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_terminal(socket, ctx, DebugSessionId::from_string(session_id), query))
}

async fn handle_terminal(socket: WebSocket, ctx: Arc<EngineContext>, session_id: DebugSessionId, query: TerminalQuery) {
    let session = match ctx.debug.attach(session_id, &query.token, to_connection_mode(query.mode)) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, %session_id, "terminal attach rejected");
            return;
        }
    };

    let container_id = match resolve_container(&ctx, &session, query.mode).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, %session_id, "terminal attach could not resolve a container");
            return;
        }
    };

    let docker_bin = crate::config::docker_bin();
    let mut child = match tokio::process::Command::new(&docker_bin)
        .args(["exec", "-i", &container_id, "sh"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(error = %e, %container_id, "failed to spawn docker exec for terminal attach");
            return;
        }
    };
    let Some(mut stdin) = child.stdin.take() else { return };
    let Some(stdout) = child.stdout.take() else { return };
    let Some(stderr) = child.stderr.take() else { return };
    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            line = out_lines.next_line() => {
                match line {
                    Ok(Some(text)) => { if sink.send(Message::Text(text)).await.is_err() { break; } }
                    _ => break,
                }
            }
            line = err_lines.next_line() => {
                if let Ok(Some(text)) = line {
                    if sink.send(Message::Text(text)).await.is_err() { break; }
                }
            }
            frame = stream.next() => {
                let Some(Ok(frame)) = frame else { break };
                let Message::Text(text) = frame else { continue };
                match TerminalCommand::parse(&text) {
                    Some(TerminalCommand::Resume) => {
                        let _ = ctx.debug.resume(session_id);
                    }
                    Some(TerminalCommand::Abort) => {
                        let _ = ctx.debug.abort(session_id);
                        break;
                    }
                    Some(TerminalCommand::Status) => {
                        if let Ok(session) = ctx.gateway.get_debug_session(session_id) {
                            let _ = sink.send(Message::Text(format!("status: {}", session.status))).await;
                        }
                    }
                    Some(TerminalCommand::Help) => {
                        let _ = sink.send(Message::Text("@resume @abort @status @help".to_string())).await;
                    }
                    None => {
                        if stdin.write_all(format!("{text}\n").as_bytes()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    let _ = child.kill().await;
}

pub fn router() -> Router<Arc<EngineContext>> {
    Router::new().route("/api/debug/:session_id/terminal", get(upgrade))
}
