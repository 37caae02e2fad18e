// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lazyafd`: assembles every [`lazyaf_daemon::EngineContext`] collaborator
//! against its concrete adapter, merges the HTTP/WS routers, runs the
//! startup orphan sweep synchronously so a restart never accepts traffic
//! against stale state, then spawns the recurring background sweepers and
//! serves.

use std::sync::Arc;
use std::time::Instant;

use lazyaf_core::SystemClock;
use lazyaf_daemon::{
    config, sweepers, CliGitProvider, DockerOrchestrator, EngineContext, PipelineRegistry,
    StaticRepositoryResolver, WsRunnerTransport,
};
use lazyaf_engine::{
    ControlTokenService, DebugSessionService, EventBus, GitProvider, InProcessWorkspaceLock,
    LocalExecutor, RunnerRegistry, WorkspaceLock, WorkspaceManager,
};
use lazyaf_storage::PersistenceGateway;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Arc::new(config::load_engine_config());
    let docker_bin = config::docker_bin();

    let gateway = PersistenceGateway::new();
    let clock = SystemClock;
    let events = EventBus::new();
    let pipelines = Arc::new(PipelineRegistry::new());
    let tokens = Arc::new(ControlTokenService::new(config::control_token_secret()));
    let transport = Arc::new(WsRunnerTransport::new());

    let orchestrator: Arc<dyn lazyaf_engine::ContainerOrchestrator> =
        Arc::new(DockerOrchestrator::new(docker_bin.clone()));
    let resolver = StaticRepositoryResolver::new(config::repo_url());
    let git: Arc<dyn GitProvider> = Arc::new(CliGitProvider::new(docker_bin, config::clone_image(), resolver));

    // Single-node deployments (the default) only ever need the in-process
    // lock; a multi-daemon one would swap this for a DB-advisory impl
    // without the `WorkspaceManager` call sites changing.
    let lock: Arc<dyn WorkspaceLock> = Arc::new(InProcessWorkspaceLock::new());

    let runners = Arc::new(RunnerRegistry::new(
        gateway.clone(),
        transport.clone(),
        clock.clone(),
        config.ack_timeout_s,
        config.runner_death_timeout_s,
    ));
    let workspaces = Arc::new(WorkspaceManager::new(
        gateway.clone(),
        orchestrator.clone(),
        git.clone(),
        lock,
        clock.clone(),
        config.orphan_grace_minutes * 60_000,
    ));
    let debug = Arc::new(DebugSessionService::new(gateway.clone(), events.clone(), clock.clone()));
    let local_executor = Arc::new(LocalExecutor::new(
        gateway.clone(),
        orchestrator,
        ControlTokenService::new(config::control_token_secret()),
        clock.clone(),
        config::backend_url(),
    ));

    let ctx = Arc::new(EngineContext {
        gateway,
        config,
        clock,
        events,
        pipelines,
        tokens,
        transport,
        runners,
        workspaces,
        debug,
        local_executor,
        git,
        backend_url: config::backend_url(),
        start_time: Instant::now(),
    });

    tracing::info!("running startup orphan sweep");
    sweepers::sweep_orphans_once(&ctx).await;
    sweepers::spawn(ctx.clone());

    let app = lazyaf_daemon::control_api::router()
        .merge(lazyaf_daemon::runner_ws::router())
        .merge(lazyaf_daemon::debug_api::router())
        .merge(lazyaf_daemon::debug_ws::router())
        .merge(lazyaf_daemon::pipeline_api::router())
        .merge(lazyaf_daemon::events_ws::router())
        .merge(lazyaf_daemon::health::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(ctx);

    let addr = config::bind_addr();
    tracing::info!(%addr, "lazyafd listening");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server exited with error");
    }
}
