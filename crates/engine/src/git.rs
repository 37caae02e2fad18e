// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git hosting collaborator interface.

use async_trait::async_trait;
use lazyaf_core::{EngineError, RepositoryId};

#[async_trait]
pub trait GitProvider: Send + Sync {
    /// Clones (or fetches into an already-cloned) `repo_id`@`branch` into
    /// the workspace volume `volume_name`, returning the resolved commit SHA.
    /// When `pin_commit` is set (debug rerun pinned to a specific commit),
    /// checks that commit out after the clone instead of leaving `branch`'s
    /// tip checked out.
    async fn checkout(
        &self,
        repo_id: RepositoryId,
        branch: &str,
        pin_commit: Option<&str>,
        volume_name: &str,
    ) -> Result<String, EngineError>;

    /// Fast-forwards `branch` to the workspace volume's current `HEAD`
    /// (the `merge:<branch>` edge action, only invoked on a successful step).
    async fn fast_forward(&self, volume_name: &str, branch: &str) -> Result<(), EngineError>;
}
