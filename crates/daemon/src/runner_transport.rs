// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunnerTransport` backed by live `axum` WebSocket sinks, one per
//! connected runner, matching the [`RunnerTransport`] contract of holding
//! no engine state of its own — only the socket handles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use lazyaf_core::{EngineError, RunnerId};
use lazyaf_engine::RunnerTransport;
use lazyaf_wire::BackendMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub type RunnerSink = SplitSink<WebSocket, Message>;

/// Outbound frame queue per connected runner; `handle_runner_socket` owns
/// the actual `WebSocket` half and drains this channel into it, since an
/// `axum::extract::ws::WebSocket` sink can't be shared behind a `Mutex`
/// across the register/assign call sites directly.
#[derive(Default, Clone)]
pub struct WsRunnerTransport {
    senders: Arc<Mutex<HashMap<RunnerId, mpsc::UnboundedSender<BackendMessage>>>>,
}

impl WsRunnerTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, runner_id: RunnerId) -> mpsc::UnboundedReceiver<BackendMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().insert(runner_id, tx);
        rx
    }

    pub fn unregister(&self, runner_id: RunnerId) {
        self.senders.lock().remove(&runner_id);
    }

    /// Pushes a frame to an already-connected runner directly, bypassing
    /// the [`RunnerTransport`] trait. Used for protocol replies (`Pong`,
    /// `Error`) that the engine itself never initiates.
    pub fn send(&self, runner_id: RunnerId, message: BackendMessage) -> Result<(), EngineError> {
        let senders = self.senders.lock();
        let tx = senders
            .get(&runner_id)
            .ok_or_else(|| EngineError::not_found(format!("no live connection for runner {runner_id}")))?;
        tx.send(message)
            .map_err(|_| EngineError::transient(format!("runner {runner_id} socket closed")))
    }
}

#[async_trait]
impl RunnerTransport for WsRunnerTransport {
    async fn send_execute_step(
        &self,
        runner_id: RunnerId,
        step_id: &str,
        execution_key: &str,
        step_config: serde_json::Value,
    ) -> Result<(), EngineError> {
        let step_config = serde_json::from_value(step_config)
            .map_err(|e| EngineError::new(lazyaf_core::ErrorKind::Protocol, format!("bad step_config: {e}")))?;
        self.send(
            runner_id,
            BackendMessage::ExecuteStep {
                step_id: step_id.to_string(),
                execution_key: execution_key.to_string(),
                step_config,
            },
        )
    }

    async fn send_abort(&self, runner_id: RunnerId, step_id: &str) -> Result<(), EngineError> {
        self.send(runner_id, BackendMessage::Abort { step_id: step_id.to_string() })
    }
}

/// Drains `rx` into `sink` until either side closes. Spawned once per
/// connected runner alongside the inbound-frame read loop.
pub async fn forward_to_socket(mut sink: RunnerSink, mut rx: mpsc::UnboundedReceiver<BackendMessage>) {
    while let Some(message) = rx.recv().await {
        let Ok(text) = serde_json::to_string(&message) else { continue };
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[path = "runner_transport_tests.rs"]
mod tests;
