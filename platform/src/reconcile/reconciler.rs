//! Container reconciliation

use std::collections::HashSet;
use std::sync::Arc;

use mdp_api::ServiceState;
use tracing::{debug, error, info, warn};

use crate::errors::PlatformError;
use crate::filesys::dir::Dir;
use crate::runtime::{
    compose_project_name, container_name, ComposeProject, ContainerRuntime, RunSpec,
};

pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Services whose runtime state was changed
    pub converged: Vec<String>,
    /// Services already matching their desired state
    pub unchanged: Vec<String>,
    /// Services with neither compose document nor image
    pub skipped: Vec<String>,
    /// Services that could not be converged, with the reason
    pub failed: Vec<(String, String)>,
    /// Stale containers and compose projects torn down
    pub removed: Vec<String>,
}

enum Outcome {
    Converged,
    Unchanged,
    Skipped,
}

/// Converges the runtime toward a set of desired services.
///
/// Nothing is cached between passes: every decision comes from inspecting the
/// runtime and the compose directory, so a pass after a restart behaves like
/// any other.
pub struct Reconciler<R: ContainerRuntime> {
    runtime: Arc<R>,
    compose_dir: Dir,
}

impl<R: ContainerRuntime> Reconciler<R> {
    pub fn new(runtime: Arc<R>, compose_dir: Dir) -> Self {
        Self { runtime, compose_dir }
    }

    /// Converge every service, then remove what is no longer desired.
    ///
    /// A failure on one service is recorded and does not stop the others.
    pub async fn reconcile(&self, services: &[ServiceState]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut desired = HashSet::new();

        for service in services {
            desired.insert(service.id.clone());
            match self.ensure_service(service).await {
                Ok(Outcome::Converged) => report.converged.push(service.id.clone()),
                Ok(Outcome::Unchanged) => report.unchanged.push(service.id.clone()),
                Ok(Outcome::Skipped) => report.skipped.push(service.id.clone()),
                Err(e) => {
                    error!("Service {} ensure failed: {}", service.id, e);
                    report.failed.push((service.id.clone(), e.to_string()));
                }
            }
        }

        self.cleanup(&desired, &mut report).await;
        report
    }

    async fn ensure_service(&self, service: &ServiceState) -> Result<Outcome, PlatformError> {
        validate_service_id(&service.id)?;
        if service.is_compose() {
            self.ensure_compose(service).await
        } else if !service.image.trim().is_empty() {
            self.ensure_container(service).await
        } else {
            debug!("Service {} has neither compose nor image, skipping", service.id);
            Ok(Outcome::Skipped)
        }
    }

    fn compose_project(&self, service_id: &str) -> ComposeProject {
        ComposeProject {
            name: compose_project_name(service_id),
            file: self
                .compose_dir
                .subdir(service_id)
                .file(COMPOSE_FILE_NAME)
                .path()
                .to_path_buf(),
        }
    }

    async fn ensure_compose(&self, service: &ServiceState) -> Result<Outcome, PlatformError> {
        let legacy = container_name(&service.id);
        if self.runtime.inspect(&legacy).await?.is_some() {
            info!("Removing single container {} of compose service {}", legacy, service.id);
            self.runtime.remove(&legacy).await?;
        }

        let project = self.compose_project(&service.id);
        let file = self.compose_dir.subdir(&service.id).file(COMPOSE_FILE_NAME);
        let unchanged = file.exists().await && file.read_string().await? == service.compose;
        if unchanged && self.runtime.compose_status(&project).await? {
            return Ok(Outcome::Unchanged);
        }

        if !unchanged {
            file.write_atomic(service.compose.as_bytes()).await?;
        }
        info!("Bringing up compose project {}", project.name);
        if let Err(e) = self.runtime.compose_up(&project).await {
            // Without the file the next pass sees a change and retries.
            if let Err(delete_err) = file.delete().await {
                warn!("Failed to drop {}: {}", file.path().display(), delete_err);
            }
            return Err(e);
        }
        Ok(Outcome::Converged)
    }

    async fn ensure_container(&self, service: &ServiceState) -> Result<Outcome, PlatformError> {
        let stack_dir = self.compose_dir.subdir(&service.id);
        if stack_dir.exists().await {
            info!("Service {} moved to a single container, tearing down its compose stack", service.id);
            self.teardown_stack(&service.id).await?;
        }

        let name = container_name(&service.id);
        let current = self.runtime.inspect(&name).await?;
        if let Some(info) = &current {
            if info.running && info.image == service.image {
                return Ok(Outcome::Unchanged);
            }
        }

        if let Err(e) = self.runtime.pull(&service.image).await {
            warn!("Pull of {} failed, trying the local image: {}", service.image, e);
        }
        if current.is_some() {
            self.runtime.remove(&name).await?;
        }

        info!("Starting {} with {}", name, service.image);
        self.runtime
            .run(&RunSpec {
                name,
                image: service.image.clone(),
                service_id: service.id.clone(),
                port: service.internal_port,
            })
            .await?;
        Ok(Outcome::Converged)
    }

    /// Bring the stack down if its file is still there, then drop the directory
    async fn teardown_stack(&self, service_id: &str) -> Result<(), PlatformError> {
        let project = self.compose_project(service_id);
        if self.compose_dir.subdir(service_id).file(COMPOSE_FILE_NAME).exists().await {
            self.runtime.compose_down(&project).await?;
        }
        self.compose_dir.subdir(service_id).delete().await
    }

    async fn cleanup(&self, desired: &HashSet<String>, report: &mut ReconcileReport) {
        match self.runtime.list_service_containers().await {
            Ok(containers) => {
                for container in containers {
                    if desired.contains(&container.service_id) {
                        continue;
                    }
                    info!("Removing stale container {}", container.name);
                    match self.runtime.remove(&container.name).await {
                        Ok(()) => report.removed.push(container.name),
                        Err(e) => error!("Failed to remove stale container {}: {}", container.name, e),
                    }
                }
            }
            Err(e) => error!("Failed to list service containers: {}", e),
        }

        let stacks = match self.compose_dir.list_dir_names().await {
            Ok(stacks) => stacks,
            Err(e) => {
                error!("Failed to list {}: {}", self.compose_dir.path().display(), e);
                return;
            }
        };
        for service_id in stacks {
            if desired.contains(&service_id) {
                continue;
            }
            info!("Bringing down stale compose stack of service {}", service_id);
            match self.teardown_stack(&service_id).await {
                Ok(()) => report.removed.push(compose_project_name(&service_id)),
                Err(e) => error!("Failed to tear down compose stack of {}: {}", service_id, e),
            }
        }
    }
}

/// Service IDs become path components under the compose directory
fn validate_service_id(id: &str) -> Result<(), PlatformError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(PlatformError::ValidationError(format!("invalid service id {:?}", id)))
    }
}
