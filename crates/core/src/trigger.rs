// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TriggerRecord`: a transient, TTL-bounded dedup marker.

use serde::{Deserialize, Serialize};

use crate::ids::{RepositoryId, RunId};

/// Builds the dedup key `"{trigger_type}:{repo_id}:{ref}"` (glossary: Trigger key).
pub fn make_trigger_key(trigger_type: &str, repo_id: &RepositoryId, git_ref: &str) -> String {
    format!("{trigger_type}:{repo_id}:{git_ref}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub key: String,
    pub pipeline_run_id: RunId,
    pub recorded_at_ms: u64,
}

impl TriggerRecord {
    pub fn new(key: String, pipeline_run_id: RunId, recorded_at_ms: u64) -> Self {
        Self { key, pipeline_run_id, recorded_at_ms }
    }

    /// Within-window check: `age < dedup_window`; a window of 0
    /// disables dedup entirely (every call is treated as non-duplicate).
    pub fn is_duplicate(&self, now_ms: u64, dedup_window_s: u64) -> bool {
        if dedup_window_s == 0 {
            return false;
        }
        now_ms.saturating_sub(self.recorded_at_ms) < dedup_window_s * 1000
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
