// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container Orchestrator Adapter interface. The narrow
//! surface consumed by both executors; `lazyaf-daemon` supplies the concrete
//! implementation that shells out to the `docker` CLI rather than linking a
//! client library, so the adapter's behavior is exactly what an operator
//! sees running the same commands by hand.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lazyaf_core::{ErrorKind, LogLine};

#[derive(Debug, Clone)]
pub struct ResourceLimits {
    pub memory_mib: u64,
    pub cpus: f64,
}

impl Default for ResourceLimits {
    /// Default 2 GiB RAM, 2 CPU.
    fn default() -> Self {
        Self { memory_mib: 2048, cpus: 2.0 }
    }
}

#[derive(Debug, Clone)]
pub struct VolumeMount {
    pub volume_name: String,
    pub container_path: String,
    pub read_only: bool,
}

/// Everything needed to start one step's container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Option<Vec<String>>,
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<VolumeMount>,
    pub network: Option<String>,
    /// `lazyaf.managed=true, lazyaf.step_id, lazyaf.step_run_id,
    /// lazyaf.pipeline_run_id, lazyaf.execution_key`.
    pub labels: BTreeMap<String, String>,
    pub resources: ResourceLimits,
}

/// An opaque reference to a running (or exited) container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle(pub String);

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("image pull failed: {0}")]
    ImagePullFailure(String),
    #[error("resources exhausted: {0}")]
    ResourceExhausted(String),
    #[error("orchestrator unavailable: {0}")]
    Unavailable(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::NotFound(_) => ErrorKind::NotFound,
            OrchestratorError::ImagePullFailure(_) => ErrorKind::ImagePullFailure,
            OrchestratorError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            OrchestratorError::Unavailable(_) => ErrorKind::Transient,
        }
    }
}

#[async_trait]
pub trait ContainerOrchestrator: Send + Sync {
    async fn create_volume(&self, name: &str, labels: &BTreeMap<String, String>) -> Result<(), OrchestratorError>;
    async fn remove_volume(&self, name: &str) -> Result<(), OrchestratorError>;

    async fn run_container(&self, spec: ContainerSpec) -> Result<ContainerHandle, OrchestratorError>;

    /// Blocks until the container exits, returning its exit code.
    async fn wait(&self, handle: &ContainerHandle) -> Result<i32, OrchestratorError>;
    async fn kill(&self, handle: &ContainerHandle) -> Result<(), OrchestratorError>;
    async fn remove(&self, handle: &ContainerHandle) -> Result<(), OrchestratorError>;

    /// Used by debug `shell` attach mode.
    async fn exec(&self, handle: &ContainerHandle, cmd: &[String]) -> Result<ContainerHandle, OrchestratorError>;

    /// Restartable from a byte offset so a reconnecting subscriber can
    /// resume without re-reading everything.
    async fn stream_logs(&self, handle: &ContainerHandle, since: u64) -> Result<Vec<LogLine>, OrchestratorError>;

    async fn image_present(&self, image: &str) -> Result<bool, OrchestratorError>;
}
