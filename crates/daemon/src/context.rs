// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `EngineContext`: every collaborator a running pipeline needs, assembled
//! once in `main.rs` and handed to HTTP/WS handlers and background
//! sweepers by `Arc` — no hidden global state, per `lazyaf-core::Config`'s
//! own doc comment.

use std::sync::Arc;
use std::time::Instant;

use lazyaf_core::{Config, SystemClock};
use lazyaf_engine::{ControlTokenService, DebugSessionService, EventBus, GitProvider, LocalExecutor, RunnerRegistry, WorkspaceManager};
use lazyaf_storage::PersistenceGateway;

use crate::pipeline_registry::PipelineRegistry;
use crate::runner_transport::WsRunnerTransport;

#[derive(Clone)]
pub struct EngineContext {
    pub gateway: PersistenceGateway,
    pub config: Arc<Config>,
    pub clock: SystemClock,
    pub events: EventBus,
    pub pipelines: Arc<PipelineRegistry>,
    pub tokens: Arc<ControlTokenService>,
    pub transport: Arc<WsRunnerTransport>,
    pub runners: Arc<RunnerRegistry<SystemClock>>,
    pub workspaces: Arc<WorkspaceManager<SystemClock>>,
    pub debug: Arc<DebugSessionService<SystemClock>>,
    pub local_executor: Arc<LocalExecutor<SystemClock>>,
    pub git: Arc<dyn GitProvider>,
    pub backend_url: String,
    pub start_time: Instant,
}
