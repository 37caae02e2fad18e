// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace Manager: one persistent container volume per
//! pipeline run, leased to steps with `continue_in_context = true` so they
//! share filesystem state, released back to the pool, and garbage-collected
//! once the owning run is terminal and past its grace period.
//!
//! `WorkspaceLock` abstracts over the locking backend: a single-node
//! deployment (`Config::single_node`, the default) only ever needs the
//! in-process impl; a multi-daemon deployment would plug in a
//! DB-advisory-lock impl against the same trait without the manager's
//! call sites changing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lazyaf_core::{
    Clock, EngineError, EngineResult, RepositoryId, RunId, Workspace, WorkspaceId, WorkspaceStatus,
};
use lazyaf_storage::PersistenceGateway;
use parking_lot::Mutex;

use crate::git::GitProvider;
use crate::orchestrator::ContainerOrchestrator;

/// Mutual exclusion for the brief window between "does a workspace exist
/// for this run" and "create one".
#[async_trait]
pub trait WorkspaceLock: Send + Sync {
    async fn lock(&self, run_id: RunId) -> Box<dyn WorkspaceLockGuard>;
}

pub trait WorkspaceLockGuard: Send {}

/// Default single-node impl: one process-wide set of currently-locked run
/// ids guarded by a `parking_lot::Mutex`, with a `tokio::Notify`-free
/// spin-yield loop (bounded, since leases are held only for the duration of
/// one `create`/`gc` call, never across an await point that waits on I/O
/// outside the manager).
#[derive(Default)]
pub struct InProcessWorkspaceLock {
    held: Arc<Mutex<HashSet<RunId>>>,
}

impl InProcessWorkspaceLock {
    pub fn new() -> Self {
        Self::default()
    }
}

struct InProcessGuard {
    held: Arc<Mutex<HashSet<RunId>>>,
    run_id: RunId,
}

impl WorkspaceLockGuard for InProcessGuard {}

impl Drop for InProcessGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.run_id);
    }
}

#[async_trait]
impl WorkspaceLock for InProcessWorkspaceLock {
    async fn lock(&self, run_id: RunId) -> Box<dyn WorkspaceLockGuard> {
        loop {
            {
                let mut held = self.held.lock();
                if held.insert(run_id) {
                    break;
                }
            }
            tokio::task::yield_now().await;
        }
        Box::new(InProcessGuard { held: self.held.clone(), run_id })
    }
}

pub struct WorkspaceManager<C: Clock> {
    gateway: PersistenceGateway,
    orchestrator: Arc<dyn ContainerOrchestrator>,
    git: Arc<dyn GitProvider>,
    lock: Arc<dyn WorkspaceLock>,
    clock: C,
    /// Grace period after a run goes terminal before its workspace is
    /// eligible for GC.
    gc_grace_ms: u64,
}

impl<C: Clock> WorkspaceManager<C> {
    pub fn new(
        gateway: PersistenceGateway,
        orchestrator: Arc<dyn ContainerOrchestrator>,
        git: Arc<dyn GitProvider>,
        lock: Arc<dyn WorkspaceLock>,
        clock: C,
        gc_grace_ms: u64,
    ) -> Self {
        Self { gateway, orchestrator, git, lock, clock, gc_grace_ms }
    }

    /// Creates the run's workspace if absent, clones `repo_id`@`branch`
    /// (optionally pinned to `pin_commit`, for a debug rerun) into its
    /// volume, and leaves it `READY`. Idempotent: a second caller for the
    /// same run observes the already-created workspace.
    pub async fn create(
        &self,
        run_id: RunId,
        repo_id: RepositoryId,
        branch: String,
        pin_commit: Option<String>,
    ) -> EngineResult<Workspace> {
        let _guard = self.lock.lock(run_id).await;

        if let Ok(existing) = self.gateway.get_workspace_for_run(run_id) {
            return Ok(existing);
        }

        let now = self.clock.epoch_ms();
        let mut workspace = Workspace::new(run_id, repo_id, branch.clone(), now);

        let mut labels = std::collections::BTreeMap::new();
        labels.insert("lazyaf.managed".to_string(), "true".to_string());
        labels.insert("lazyaf.pipeline_run_id".to_string(), run_id.to_string());
        self.orchestrator
            .create_volume(&workspace.volume_name, &labels)
            .await
            .map_err(|e| EngineError::new(e.kind(), e.to_string()))?;

        let commit_sha = self
            .git
            .checkout(repo_id, &branch, pin_commit.as_deref(), &workspace.volume_name)
            .await?;
        workspace.commit_sha = Some(commit_sha);
        workspace.status = WorkspaceStatus::Ready;

        self.gateway.insert_workspace(workspace.clone())?;
        Ok(workspace)
    }

    /// Leases the workspace to a step with `continue_in_context = true`.
    pub fn acquire(&self, workspace_id: WorkspaceId) -> EngineResult<Workspace> {
        let now = self.clock.epoch_ms();
        self.gateway.acquire_lease(workspace_id, now)
    }

    pub fn release(&self, workspace_id: WorkspaceId) -> EngineResult<Workspace> {
        let now = self.clock.epoch_ms();
        self.gateway.release_lease(workspace_id, now)
    }

    /// Tears down the volume and marks the workspace `CLEANED`; refuses
    /// while any lease is outstanding.
    pub async fn cleanup(&self, workspace_id: WorkspaceId) -> EngineResult<Workspace> {
        let workspace = self.gateway.get_workspace(workspace_id)?;
        if workspace.use_count > 0 {
            return Err(EngineError::conflict(format!(
                "workspace {workspace_id} still has {} outstanding lease(s)",
                workspace.use_count
            )));
        }

        self.gateway.transition_workspace(
            workspace_id,
            &[WorkspaceStatus::Ready, WorkspaceStatus::Failed],
            WorkspaceStatus::Cleaning,
        )?;

        let result = self.orchestrator.remove_volume(&workspace.volume_name).await;
        let final_status = match result {
            Ok(()) => WorkspaceStatus::Cleaned,
            Err(_) => WorkspaceStatus::Failed,
        };
        self.gateway.transition_workspace(
            workspace_id,
            &[WorkspaceStatus::Cleaning],
            final_status,
        )
    }

    /// Sweeps workspaces owned by terminal runs past the grace period
    /// and cleans each one up.
    pub async fn gc_orphans(&self) -> Vec<WorkspaceId> {
        let now = self.clock.epoch_ms();
        let candidates = self.gateway.workspaces_eligible_for_gc(now, self.gc_grace_ms);
        let mut cleaned = Vec::new();
        for id in candidates {
            if self.cleanup(id).await.is_ok() {
                cleaned.push(id);
            }
        }
        cleaned
    }
}

#[cfg(test)]
#[path = "workspace_manager_tests.rs"]
mod tests;
