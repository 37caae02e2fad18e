// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lazyaf-daemon: the single binary that wires the `lazyaf-engine`
//! collaborators to concrete adapters (`docker` CLI, `git` CLI, `axum`
//! WebSockets) and exposes the HTTP/WS control surface. `main.rs` is the
//! bootstrap; everything else here is a library so it can be exercised by
//! `#[cfg(test)]` unit tests without a running process.

pub mod config;
pub mod context;
pub mod control_api;
pub mod debug_api;
pub mod debug_ws;
pub mod docker;
pub mod events_ws;
pub mod git;
pub mod health;
pub mod pipeline_api;
pub mod pipeline_registry;
pub mod run_driver;
pub mod runner_transport;
pub mod runner_ws;
pub mod sweepers;

pub use context::EngineContext;
pub use docker::DockerOrchestrator;
pub use git::{CliGitProvider, RepositoryResolver, StaticRepositoryResolver};
pub use pipeline_registry::PipelineRegistry;
pub use run_driver::{finalize_step_run, RunDriver};
pub use runner_transport::{forward_to_socket, RunnerSink, WsRunnerTransport};
