// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ContainerOrchestrator` implementation that shells out to the `docker`
//! CLI rather than linking a client library, so the adapter's behavior is
//! exactly what an operator sees running the same commands by hand.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lazyaf_core::LogLine;
use lazyaf_engine::{ContainerHandle, ContainerOrchestrator, ContainerSpec, OrchestratorError};
use tokio::process::Command;

pub struct DockerOrchestrator {
    docker_bin: String,
}

impl DockerOrchestrator {
    pub fn new(docker_bin: impl Into<String>) -> Self {
        Self { docker_bin: docker_bin.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<String, OrchestratorError> {
        let output = Command::new(&self.docker_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| OrchestratorError::Unavailable(format!("failed to exec docker: {e}")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(classify_docker_error(args.first().copied().unwrap_or(""), &stderr))
        }
    }
}

/// Maps a `docker` CLI failure onto the narrower `OrchestratorError`
/// taxonomy by pattern-matching the stderr text, the same way an operator
/// would read the message to decide what went wrong.
fn classify_docker_error(subcommand: &str, stderr: &str) -> OrchestratorError {
    let lower = stderr.to_lowercase();
    if lower.contains("no such container") || lower.contains("no such volume") || lower.contains("no such image") {
        OrchestratorError::NotFound(stderr.to_string())
    } else if lower.contains("pull access denied")
        || lower.contains("manifest unknown")
        || lower.contains("not found: manifest")
    {
        OrchestratorError::ImagePullFailure(stderr.to_string())
    } else if lower.contains("no space left")
        || lower.contains("cannot allocate memory")
        || lower.contains("resource temporarily unavailable")
    {
        OrchestratorError::ResourceExhausted(stderr.to_string())
    } else {
        OrchestratorError::Unavailable(format!("docker {subcommand} failed: {stderr}"))
    }
}

fn format_mount(mount: &lazyaf_engine::VolumeMount) -> String {
    if mount.read_only {
        format!("{}:{}:ro", mount.volume_name, mount.container_path)
    } else {
        format!("{}:{}", mount.volume_name, mount.container_path)
    }
}

#[async_trait]
impl ContainerOrchestrator for DockerOrchestrator {
    async fn create_volume(&self, name: &str, labels: &BTreeMap<String, String>) -> Result<(), OrchestratorError> {
        let mut args = vec!["volume", "create"];
        let label_args: Vec<String> = labels.iter().map(|(k, v)| format!("--label={k}={v}")).collect();
        for label in &label_args {
            args.push(label.as_str());
        }
        args.push(name);
        self.run(&args).await?;
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<(), OrchestratorError> {
        self.run(&["volume", "rm", "-f", name]).await?;
        Ok(())
    }

    async fn run_container(&self, spec: ContainerSpec) -> Result<ContainerHandle, OrchestratorError> {
        let mut args = vec!["run".to_string(), "-d".to_string(), "--name".to_string(), spec.name.clone()];

        args.push(format!("--memory={}m", spec.resources.memory_mib));
        args.push(format!("--cpus={}", spec.resources.cpus));

        for (k, v) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{k}={v}"));
        }
        for mount in &spec.mounts {
            args.push("-v".to_string());
            args.push(format_mount(mount));
        }
        for (k, v) in &spec.labels {
            args.push(format!("--label={k}={v}"));
        }
        if let Some(network) = &spec.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }

        args.push(spec.image.clone());
        if let Some(command) = &spec.command {
            args.extend(command.iter().cloned());
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let container_id = self.run(&arg_refs).await?;
        Ok(ContainerHandle(container_id))
    }

    async fn wait(&self, handle: &ContainerHandle) -> Result<i32, OrchestratorError> {
        let out = self.run(&["wait", &handle.0]).await?;
        out.trim().parse::<i32>().map_err(|e| {
            OrchestratorError::Unavailable(format!("unparseable exit code from docker wait: {e}"))
        })
    }

    async fn kill(&self, handle: &ContainerHandle) -> Result<(), OrchestratorError> {
        self.run(&["kill", &handle.0]).await?;
        Ok(())
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), OrchestratorError> {
        self.run(&["rm", "-f", &handle.0]).await?;
        Ok(())
    }

    async fn exec(&self, handle: &ContainerHandle, cmd: &[String]) -> Result<ContainerHandle, OrchestratorError> {
        let mut args = vec!["exec".to_string(), "-d".to_string(), handle.0.clone()];
        args.extend(cmd.iter().cloned());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs).await?;
        Ok(handle.clone())
    }

    async fn stream_logs(&self, handle: &ContainerHandle, since: u64) -> Result<Vec<LogLine>, OrchestratorError> {
        let since_arg = format!("--since={since}");
        let out = self.run(&["logs", "--timestamps", &since_arg, &handle.0]).await?;
        Ok(out
            .lines()
            .map(|line| lazyaf_core::LogLine {
                content: line.to_string(),
                stream: lazyaf_core::LogStream::Stdout,
                timestamp_ms: since,
            })
            .collect())
    }

    async fn image_present(&self, image: &str) -> Result<bool, OrchestratorError> {
        match self.run(&["image", "inspect", image]).await {
            Ok(_) => Ok(true),
            Err(OrchestratorError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
