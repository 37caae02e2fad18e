// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate. Assembles
//! the engine-wide [`lazyaf_core::Config`] plus the process-level settings
//! (bind address, control-token secret, state directory) that only the
//! daemon binary itself needs.

use std::path::PathBuf;

use lazyaf_core::Config;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Bind address for the control-plane HTTP/WS server (`LAZYAF_BIND_ADDR`,
/// default `0.0.0.0:8099`).
pub fn bind_addr() -> String {
    std::env::var("LAZYAF_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8099".to_string())
}

/// State directory: `LAZYAF_STATE_DIR` > `XDG_STATE_HOME/lazyaf` >
/// `~/.local/state/lazyaf`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LAZYAF_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("lazyaf");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".local/state/lazyaf")
}

/// Secret backing the control-layer HMAC step tokens
/// (`LAZYAF_CONTROL_TOKEN_SECRET`). Falls back to a fixed development secret
/// so a first-run daemon still boots; any production deployment is expected
/// to set this explicitly.
pub fn control_token_secret() -> String {
    std::env::var("LAZYAF_CONTROL_TOKEN_SECRET")
        .unwrap_or_else(|_| "lazyaf-dev-secret-change-me".to_string())
}

/// `docker` binary to shell out to (`LAZYAF_DOCKER_BIN`, default `docker`).
pub fn docker_bin() -> String {
    std::env::var("LAZYAF_DOCKER_BIN").unwrap_or_else(|_| "docker".to_string())
}

/// `git` binary to shell out to (`LAZYAF_GIT_BIN`, default `git`).
pub fn git_bin() -> String {
    std::env::var("LAZYAF_GIT_BIN").unwrap_or_else(|_| "git".to_string())
}

/// URL step containers call back into this daemon on
/// (`LAZYAF_BACKEND_URL`), baked into `LAZYAF_BACKEND_URL` inside every
/// step's environment. Distinct from [`bind_addr`]: a container reaches the
/// host over a different address than the one the daemon binds to.
pub fn backend_url() -> String {
    std::env::var("LAZYAF_BACKEND_URL").unwrap_or_else(|_| "http://host.docker.internal:8099".to_string())
}

/// Image the throwaway clone/fast-forward containers run (`LAZYAF_CLONE_IMAGE`,
/// default `alpine/git:latest`); only needs `git` on `PATH`.
pub fn clone_image() -> String {
    std::env::var("LAZYAF_CLONE_IMAGE").unwrap_or_else(|_| "alpine/git:latest".to_string())
}

/// Clone URL every [`crate::git::StaticRepositoryResolver`] resolves
/// [`lazyaf_core::RepositoryId`] to (`LAZYAF_REPO_URL`). A single-node
/// deployment only ever tracks one repository; a multi-tenant one would
/// swap this resolver for a lookup against a repository registry instead.
pub fn repo_url() -> String {
    std::env::var("LAZYAF_REPO_URL").unwrap_or_else(|_| ".".to_string())
}

/// Assembles the engine-wide [`Config`] from `LAZYAF_*` environment
/// variables, falling back to [`Config::default`] for anything unset.
pub fn load_engine_config() -> Config {
    let defaults = Config::default();
    Config {
        database_url: std::env::var("LAZYAF_DATABASE_URL").unwrap_or_else(|_| defaults.database_url.clone()),
        docker_host: std::env::var("LAZYAF_DOCKER_HOST").ok(),
        default_runner_type: defaults.default_runner_type.clone(),
        use_local_executor: env_bool("LAZYAF_USE_LOCAL_EXECUTOR", defaults.use_local_executor),
        force_remote: env_bool("LAZYAF_FORCE_REMOTE", defaults.force_remote),
        heartbeat_interval_s: env_u64("LAZYAF_HEARTBEAT_INTERVAL_S", defaults.heartbeat_interval_s),
        registration_timeout_s: env_u64(
            "LAZYAF_REGISTRATION_TIMEOUT_S",
            defaults.registration_timeout_s,
        ),
        ack_timeout_s: env_u64("LAZYAF_ACK_TIMEOUT_S", defaults.ack_timeout_s),
        runner_death_timeout_s: env_u64(
            "LAZYAF_RUNNER_DEATH_TIMEOUT_S",
            defaults.runner_death_timeout_s,
        ),
        default_step_timeout_s: env_u64(
            "LAZYAF_DEFAULT_STEP_TIMEOUT_S",
            defaults.default_step_timeout_s,
        ),
        trigger_dedup_window_s: env_u64(
            "LAZYAF_TRIGGER_DEDUP_WINDOW_S",
            defaults.trigger_dedup_window_s,
        ),
        debug_default_timeout_s: env_u64(
            "LAZYAF_DEBUG_DEFAULT_TIMEOUT_S",
            defaults.debug_default_timeout_s,
        ),
        debug_max_timeout_s: env_u64("LAZYAF_DEBUG_MAX_TIMEOUT_S", defaults.debug_max_timeout_s),
        orphan_grace_minutes: env_u64("LAZYAF_ORPHAN_GRACE_MINUTES", defaults.orphan_grace_minutes),
        completed_exec_retention_days: env_u64(
            "LAZYAF_COMPLETED_EXEC_RETENTION_DAYS",
            defaults.completed_exec_retention_days,
        ),
        allow_local_agent_steps: env_bool(
            "LAZYAF_ALLOW_LOCAL_AGENT_STEPS",
            defaults.allow_local_agent_steps,
        ),
        single_node: env_bool("LAZYAF_SINGLE_NODE", defaults.single_node),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
