//! Container runtime abstraction used by the reconciler

pub mod docker;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::PlatformError;

pub use docker::DockerCli;

/// Label carrying the owning service ID on every managed container
pub const SERVICE_LABEL: &str = "mdp.service";

/// Name of the single container running a service
pub fn container_name(service_id: &str) -> String {
    format!("svc-{}", service_id)
}

/// Compose project name of a service stack
pub fn compose_project_name(service_id: &str) -> String {
    format!("mdp-{}", service_id)
}

/// Observed state of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub image: String,
    pub running: bool,
}

/// A container carrying the service label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledContainer {
    pub name: String,
    pub service_id: String,
}

/// Everything needed to start a service container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub service_id: String,
    /// Published on loopback as `127.0.0.1:<port>:<port>`
    pub port: u16,
}

/// A compose stack materialized on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    pub name: String,
    pub file: PathBuf,
}

/// Narrow view of the container engine. Implementations must be safe to
/// call from several tasks.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// `None` when no container of that name exists
    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>, PlatformError>;

    async fn pull(&self, image: &str) -> Result<(), PlatformError>;

    /// Start a detached container restarted unless stopped
    async fn run(&self, spec: &RunSpec) -> Result<(), PlatformError>;

    /// Force-remove a container
    async fn remove(&self, name: &str) -> Result<(), PlatformError>;

    /// Containers carrying [`SERVICE_LABEL`]
    async fn list_service_containers(&self) -> Result<Vec<LabeledContainer>, PlatformError>;

    /// Whether the stack has running containers
    async fn compose_status(&self, project: &ComposeProject) -> Result<bool, PlatformError>;

    /// Pull and start the stack, removing orphans
    async fn compose_up(&self, project: &ComposeProject) -> Result<(), PlatformError>;

    async fn compose_down(&self, project: &ComposeProject) -> Result<(), PlatformError>;
}
