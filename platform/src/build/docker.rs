//! Source checkout and image build through git and the docker CLI

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::build::{BuildOutput, Builder};
use crate::errors::PlatformError;
use crate::filesys::dir::Dir;
use crate::models::repository::{sanitize_key, split_full_name};
use crate::models::BuildJob;

const MASK: &str = "****";

/// Docker builder options
#[derive(Debug, Clone)]
pub struct DockerBuilderOptions {
    /// Parent of the per-job checkouts
    pub workspace: Dir,

    /// Image prefix such as `ghcr.io/acme`; `ghcr.io/<owner>` when empty
    pub registry_prefix: String,

    /// Push built images
    pub push: bool,

    /// Keep the checkout after the build
    pub keep_workspace: bool,

    /// Token used to clone private repositories
    pub github_token: Option<SecretString>,
}

impl Default for DockerBuilderOptions {
    fn default() -> Self {
        Self {
            workspace: Dir::new("./worker-tmp"),
            registry_prefix: String::new(),
            push: false,
            keep_workspace: false,
            github_token: None,
        }
    }
}

/// Clones the job's repository at its commit and runs `docker build`
pub struct DockerBuilder {
    options: DockerBuilderOptions,
}

impl DockerBuilder {
    pub fn new(options: DockerBuilderOptions) -> Self {
        Self { options }
    }

    fn token(&self) -> Option<&str> {
        self.options
            .github_token
            .as_ref()
            .map(|token| token.expose_secret())
            .filter(|token| !token.is_empty())
    }

    /// Image reference for a job: `<prefix>/<name>:<sha12>`, lowercased
    pub fn image_name(&self, owner: &str, name: &str, commit: &str) -> String {
        let prefix = if self.options.registry_prefix.trim().is_empty() {
            format!("ghcr.io/{}", owner.to_lowercase())
        } else {
            self.options.registry_prefix.trim().trim_end_matches('/').to_string()
        };
        format!("{}/{}:{}", prefix, name.to_lowercase(), short_sha(commit))
    }

    async fn run_command(
        &self,
        dir: Option<&Path>,
        env: &[(&str, &str)],
        program: &str,
        args: &[&str],
    ) -> Result<(), PlatformError> {
        let printable = mask_secret(&format!("{} {}", program, args.join(" ")), self.token());
        info!("exec: {}", printable);

        let mut command = Command::new(program);
        command.args(args).envs(env.iter().copied()).kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| PlatformError::BuildError(format!("failed to run {}: {}", printable, e)))?;
        debug!("{} stdout: {}", program, String::from_utf8_lossy(&output.stdout).trim());

        if !output.status.success() {
            let stderr = mask_secret(String::from_utf8_lossy(&output.stderr).trim(), self.token());
            return Err(PlatformError::BuildError(format!(
                "{} exited with {}: {}",
                printable, output.status, stderr
            )));
        }
        Ok(())
    }

    async fn checkout_and_build(
        &self,
        job: &BuildJob,
        workdir: &Path,
        owner: &str,
        name: &str,
    ) -> Result<BuildOutput, PlatformError> {
        const GIT_ENV: &[(&str, &str)] = &[("GIT_TERMINAL_PROMPT", "0")];

        let public_url = format!("https://github.com/{}.git", job.repository);
        let clone_url = match self.token() {
            Some(token) => format!("https://{}@github.com/{}.git", token, job.repository),
            None => public_url.clone(),
        };
        let workdir_str = workdir.to_string_lossy();

        self.run_command(
            Some(self.options.workspace.path()),
            GIT_ENV,
            "git",
            &["clone", "--depth", "1", &clone_url, &workdir_str],
        )
        .await?;
        self.run_command(Some(workdir), GIT_ENV, "git", &["fetch", "--depth", "1", "origin", &job.commit])
            .await?;
        self.run_command(Some(workdir), GIT_ENV, "git", &["checkout", &job.commit])
            .await?;
        if self.token().is_some() {
            // Do not leave the token in the checkout's git config.
            if let Err(e) = self
                .run_command(Some(workdir), GIT_ENV, "git", &["remote", "set-url", "origin", &public_url])
                .await
            {
                warn!("Failed to reset origin url: {}", e);
            }
        }

        let compose = self.read_compose(job, workdir).await;

        let image = self.image_name(owner, name, &job.commit);
        self.run_command(Some(workdir), &[("DOCKER_BUILDKIT", "1")], "docker", &["build", "-t", &image, "."])
            .await?;
        if self.options.push {
            self.run_command(None, &[], "docker", &["push", &image]).await?;
        }

        Ok(BuildOutput {
            artifacts: vec![image],
            compose,
        })
    }

    async fn read_compose(&self, job: &BuildJob, workdir: &Path) -> Option<String> {
        let compose_path = job.compose_path.trim();
        if compose_path.is_empty() {
            return None;
        }
        if Path::new(compose_path)
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir))
        {
            warn!("Ignoring compose path {} outside the checkout", compose_path);
            return None;
        }
        match tokio::fs::read_to_string(workdir.join(compose_path)).await {
            Ok(compose) => Some(compose),
            Err(e) => {
                warn!("Compose file {} not found: {}", compose_path, e);
                None
            }
        }
    }
}

#[async_trait]
impl Builder for DockerBuilder {
    async fn build(&self, job: &BuildJob) -> Result<BuildOutput, PlatformError> {
        let (owner, name) = split_full_name(&job.repository)
            .ok_or_else(|| PlatformError::BuildError(format!("invalid repository: {}", job.repository)))?;

        let key = sanitize_key(&job.id);
        if key.is_empty() {
            return Err(PlatformError::BuildError(format!("invalid build job id: {:?}", job.id)));
        }

        self.options.workspace.create().await?;
        let workdir = self.options.workspace.subdir(&key);
        workdir.delete().await?;

        let result = self.checkout_and_build(job, workdir.path(), &owner, &name).await;

        if !self.options.keep_workspace {
            if let Err(e) = workdir.delete().await {
                warn!("Failed to clean workspace {}: {}", workdir.path().display(), e);
            }
        }
        result
    }
}

fn short_sha(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}

fn mask_secret(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => text.replace(secret, MASK),
        _ => text.to_string(),
    }
}
