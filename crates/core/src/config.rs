// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-wide configuration. Assembled once at startup by
//! `lazyaf-daemon::env` and threaded explicitly through the `Engine`/
//! `EngineContext` struct — no hidden global state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultRunnerType {
    Any,
    ClaudeCode,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub docker_host: Option<String>,
    pub default_runner_type: DefaultRunnerType,
    pub use_local_executor: bool,
    pub force_remote: bool,
    pub heartbeat_interval_s: u64,
    pub registration_timeout_s: u64,
    pub ack_timeout_s: u64,
    pub runner_death_timeout_s: u64,
    pub default_step_timeout_s: u64,
    pub trigger_dedup_window_s: u64,
    pub debug_default_timeout_s: u64,
    pub debug_max_timeout_s: u64,
    pub orphan_grace_minutes: u64,
    pub completed_exec_retention_days: u64,
    /// Whether agent-type steps may execute on the Local Executor.
    /// Default `false`: agent steps always route Remote.
    pub allow_local_agent_steps: bool,
    /// Selects the in-process lock map (`true`) vs. the DB-advisory-lock
    /// `WorkspaceLock` backend (`false`, required once more than one
    /// engine instance shares a database).
    pub single_node: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://lazyaf.db".to_string(),
            docker_host: None,
            default_runner_type: DefaultRunnerType::Any,
            use_local_executor: true,
            force_remote: false,
            heartbeat_interval_s: 10,
            registration_timeout_s: 10,
            ack_timeout_s: 5,
            runner_death_timeout_s: 30,
            default_step_timeout_s: 3600,
            trigger_dedup_window_s: 3600,
            debug_default_timeout_s: 3600,
            debug_max_timeout_s: 14400,
            orphan_grace_minutes: 5,
            completed_exec_retention_days: 30,
            allow_local_agent_steps: false,
            single_node: true,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
