// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identifier, lifecycle status, and lease accounting.
//!
//! A workspace is the persistent volume shared by all steps of one pipeline
//! run. `use_count` is the reference count of outstanding shared leases;
//! `CLEANING` is only reachable with `use_count == 0`.

use serde::{Deserialize, Serialize};

use crate::ids::{RepositoryId, RunId, WorkspaceId};
use crate::state_machine::StateTable;

/// Status of a workspace in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    Creating,
    Ready,
    InUse,
    Cleaning,
    Failed,
    Cleaned,
}

crate::simple_display! {
    WorkspaceStatus {
        Creating => "creating",
        Ready => "ready",
        InUse => "in_use",
        Cleaning => "cleaning",
        Failed => "failed",
        Cleaned => "cleaned",
    }
}

impl StateTable for WorkspaceStatus {
    fn allowed_next(&self) -> &'static [Self] {
        use WorkspaceStatus::*;
        match self {
            Creating => &[Ready, Failed],
            Ready => &[InUse, Cleaning],
            InUse => &[Ready],
            Cleaning => &[Cleaned, Failed],
            Failed => &[Cleaning],
            Cleaned => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, WorkspaceStatus::Cleaned)
    }
}

/// `{id = "ws-<run_id_prefix>", pipeline_run_id (unique), ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub pipeline_run_id: RunId,
    pub status: WorkspaceStatus,
    pub use_count: u32,
    pub volume_name: String,
    pub repo_id: RepositoryId,
    pub branch: String,
    pub commit_sha: Option<String>,
    pub last_activity_at_ms: u64,
}

impl Workspace {
    pub fn new(run_id: RunId, repo_id: RepositoryId, branch: String, created_at_ms: u64) -> Self {
        let volume_name = format!("lazyaf-ws-{}", run_id.short(8));
        Self {
            id: WorkspaceId::from_string(format!("wks-{}", run_id.short(19))),
            pipeline_run_id: run_id,
            status: WorkspaceStatus::Creating,
            use_count: 0,
            volume_name,
            repo_id,
            branch,
            commit_sha: None,
            last_activity_at_ms: created_at_ms,
        }
    }

    /// Invariant check: `IN_USE` implies
    /// `use_count >= 1`.
    pub fn invariant_holds(&self) -> bool {
        if self.status == WorkspaceStatus::InUse {
            self.use_count >= 1
        } else {
            true
        }
    }

    /// `READY -> CLEANING` and `IN_USE -> READY` both require `use_count == 0`.
    pub fn can_enter_cleaning(&self) -> bool {
        self.status == WorkspaceStatus::Ready && self.use_count == 0
    }
}

/// An outstanding shared acquisition of a workspace (spec glossary: Lease).
#[derive(Debug, Clone)]
pub struct Lease {
    pub workspace_id: WorkspaceId,
    pub holder: String,
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
