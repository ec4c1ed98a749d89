//! Build worker: turns claimed build jobs into images and deployments

pub mod docker;
pub mod worker;

use async_trait::async_trait;

use crate::errors::PlatformError;
use crate::models::BuildJob;

pub use docker::{DockerBuilder, DockerBuilderOptions};
pub use worker::{poll_once, process_job};

/// Result of building one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    /// Image references produced, the first one is deployed
    pub artifacts: Vec<String>,
    /// Compose document found at the job's compose path
    pub compose: Option<String>,
}

/// Builder trait for testability
#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self, job: &BuildJob) -> Result<BuildOutput, PlatformError>;
}
