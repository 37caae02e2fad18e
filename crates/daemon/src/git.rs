// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GitProvider` implementation that provisions a workspace volume by
//! running a throwaway container against it, the same init-container
//! pattern the teacher's Docker agent adapter uses to seed source before a
//! step container starts — a Docker volume is only reachable from inside a
//! container, so the clone itself has to run there too.

use async_trait::async_trait;
use lazyaf_core::{EngineError, RepositoryId};
use lazyaf_engine::GitProvider;
use tokio::process::Command;

/// Resolves a [`RepositoryId`] to a clone URL. A single-node deployment
/// keeps this mapping in-process; a multi-tenant deployment would back it
/// with a lookup against the repository registry instead.
pub trait RepositoryResolver: Send + Sync {
    fn clone_url(&self, repo_id: RepositoryId) -> Option<String>;
}

pub struct StaticRepositoryResolver {
    url: String,
}

impl StaticRepositoryResolver {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl RepositoryResolver for StaticRepositoryResolver {
    fn clone_url(&self, _repo_id: RepositoryId) -> Option<String> {
        Some(self.url.clone())
    }
}

pub struct CliGitProvider<R: RepositoryResolver> {
    docker_bin: String,
    /// Image the throwaway clone container runs; only needs `git` on `PATH`.
    clone_image: String,
    resolver: R,
}

impl<R: RepositoryResolver> CliGitProvider<R> {
    pub fn new(docker_bin: impl Into<String>, clone_image: impl Into<String>, resolver: R) -> Self {
        Self { docker_bin: docker_bin.into(), clone_image: clone_image.into(), resolver }
    }

    async fn run_docker(&self, args: &[&str]) -> Result<String, EngineError> {
        let output = Command::new(&self.docker_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| EngineError::transient(format!("failed to exec docker: {e}")))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(EngineError::transient(format!("docker {} failed: {stderr}", args.first().unwrap_or(&""))))
        }
    }
}

#[async_trait]
impl<R: RepositoryResolver> GitProvider for CliGitProvider<R> {
    async fn checkout(
        &self,
        repo_id: RepositoryId,
        branch: &str,
        pin_commit: Option<&str>,
        volume_name: &str,
    ) -> Result<String, EngineError> {
        let url = self
            .resolver
            .clone_url(repo_id)
            .ok_or_else(|| EngineError::not_found(format!("no clone URL for repository {repo_id}")))?;

        let vol_arg = format!("{volume_name}:/workspace");
        // A pinned commit may not be the branch tip, so the shallow
        // `--depth 1` clone only applies when following the branch as-is.
        let depth_arg = if pin_commit.is_some() { "" } else { "--depth 1" };
        let checkout_commit = pin_commit
            .map(|commit| format!("git -C /workspace checkout {commit} && "))
            .unwrap_or_default();
        let clone_cmd = format!(
            "git clone --branch {branch} --single-branch {depth_arg} {url} /workspace && {checkout_commit}git -C /workspace rev-parse HEAD"
        );

        let sha = self
            .run_docker(&["run", "--rm", "-v", &vol_arg, &self.clone_image, "sh", "-c", &clone_cmd])
            .await?;

        let sha = sha.lines().last().unwrap_or_default().trim().to_string();
        if sha.is_empty() {
            return Err(EngineError::transient(format!("git clone into {volume_name} produced no commit SHA")));
        }
        Ok(sha)
    }

    async fn fast_forward(&self, volume_name: &str, branch: &str) -> Result<(), EngineError> {
        let vol_arg = format!("{volume_name}:/workspace");
        let cmd = format!("git -C /workspace push origin HEAD:{branch}");
        self.run_docker(&["run", "--rm", "-v", &vol_arg, &self.clone_image, "sh", "-c", &cmd]).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
