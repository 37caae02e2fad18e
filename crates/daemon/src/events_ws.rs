// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws/events`: a read-only feed of the Event Bus for UI subscribers.
//! Unlike [`crate::runner_ws`] this direction never reads client frames —
//! a dropped or lagging subscriber just falls behind its own cursor into
//! the broadcast ring buffer per [`lazyaf_engine::EventBus`]'s own doc
//! comment, and is told so with a `lagged` frame instead of silently
//! losing events with no signal.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::SinkExt;
use lazyaf_engine::Delivery;

use crate::context::EngineContext;

async fn upgrade(State(ctx): State<Arc<EngineContext>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_events(socket, ctx))
}

async fn stream_events(mut socket: WebSocket, ctx: Arc<EngineContext>) {
    let mut subscription = ctx.events.subscribe();
    loop {
        let Some(delivery) = subscription.recv().await else { break };
        let text = match delivery {
            Delivery::Event(event) => match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Delivery::Lagged(skipped) => format!(r#"{{"type":"lagged","skipped":{skipped}}}"#),
        };
        if socket.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}

pub fn router() -> Router<Arc<EngineContext>> {
    Router::new().route("/ws/events", get(upgrade))
}
