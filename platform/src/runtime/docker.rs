//! Docker CLI backed container runtime

use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::PlatformError;
use crate::runtime::{
    ComposeProject, ContainerInfo, ContainerRuntime, LabeledContainer, RunSpec, SERVICE_LABEL,
};

/// Drives the local engine through the `docker` binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    async fn output(&self, args: &[&str]) -> Result<Output, PlatformError> {
        debug!("Running {} {}", self.binary, args.join(" "));
        Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PlatformError::RuntimeCommandFailure(format!("failed to run {}: {}", self.binary, e)))
    }

    /// Run a command and return its stdout, failing on a non-zero exit
    async fn exec(&self, args: &[&str]) -> Result<String, PlatformError> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(command_failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn compose_args<'a>(project: &'a ComposeProject, file: &'a str, rest: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec!["compose", "-f", file, "-p", project.name.as_str()];
        args.extend_from_slice(rest);
        args
    }
}

fn command_failure(args: &[&str], output: &Output) -> PlatformError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    PlatformError::RuntimeCommandFailure(format!(
        "docker {} exited with {}: {}",
        args.join(" "),
        output.status,
        stderr.trim()
    ))
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>, PlatformError> {
        let args = [
            "inspect",
            "--type",
            "container",
            "--format",
            "{{.Config.Image}}|{{.State.Running}}",
            name,
        ];
        let output = self.output(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such") {
                return Ok(None);
            }
            return Err(command_failure(&args, &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (image, running) = stdout.trim().rsplit_once('|').ok_or_else(|| {
            PlatformError::RuntimeCommandFailure(format!("unexpected inspect output for {}: {}", name, stdout.trim()))
        })?;
        Ok(Some(ContainerInfo {
            image: image.to_string(),
            running: running == "true",
        }))
    }

    async fn pull(&self, image: &str) -> Result<(), PlatformError> {
        self.exec(&["pull", image]).await.map(|_| ())
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), PlatformError> {
        let label = format!("{}={}", SERVICE_LABEL, spec.service_id);
        let publish = format!("127.0.0.1:{}:{}", spec.port, spec.port);
        self.exec(&[
            "run",
            "-d",
            "--restart",
            "unless-stopped",
            "--name",
            &spec.name,
            "--label",
            &label,
            "-p",
            &publish,
            &spec.image,
        ])
        .await
        .map(|_| ())
    }

    async fn remove(&self, name: &str) -> Result<(), PlatformError> {
        self.exec(&["rm", "-f", name]).await.map(|_| ())
    }

    async fn list_service_containers(&self) -> Result<Vec<LabeledContainer>, PlatformError> {
        let filter = format!("label={}", SERVICE_LABEL);
        let format = format!("{{{{.Names}}}} {{{{.Label \"{}\"}}}}", SERVICE_LABEL);
        let stdout = self
            .exec(&["ps", "-a", "--filter", &filter, "--format", &format])
            .await?;

        Ok(stdout
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(name), Some(service_id), None) => Some(LabeledContainer {
                        name: name.to_string(),
                        service_id: service_id.to_string(),
                    }),
                    _ => None,
                }
            })
            .collect())
    }

    async fn compose_status(&self, project: &ComposeProject) -> Result<bool, PlatformError> {
        let file = project.file.to_string_lossy();
        let args = Self::compose_args(project, &file, &["ps", "--status", "running", "-q"]);
        let stdout = self.exec(&args).await?;
        Ok(!stdout.trim().is_empty())
    }

    async fn compose_up(&self, project: &ComposeProject) -> Result<(), PlatformError> {
        let file = project.file.to_string_lossy();
        if let Err(e) = self.exec(&Self::compose_args(project, &file, &["pull"])).await {
            warn!("Compose pull for {} failed: {}", project.name, e);
        }
        let args = Self::compose_args(project, &file, &["up", "-d", "--remove-orphans"]);
        self.exec(&args).await.map(|_| ())
    }

    async fn compose_down(&self, project: &ComposeProject) -> Result<(), PlatformError> {
        let file = project.file.to_string_lossy();
        let args = Self::compose_args(project, &file, &["down", "--remove-orphans"]);
        self.exec(&args).await.map(|_| ())
    }
}
