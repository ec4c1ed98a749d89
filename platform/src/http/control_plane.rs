//! Typed control-plane calls used by the agent and the build worker

use async_trait::async_trait;
use mdp_api::{
    ClaimRequest, ComposeRequest, DeploymentRequest, HealthResponse, ServiceState,
    ServiceStateResponse, UpdateBuildJobRequest,
};

use crate::errors::PlatformError;
use crate::http::client::HttpClient;
use crate::models::{BuildJob, Deployment};

/// Control-plane API trait for testability
#[async_trait]
pub trait ControlPlaneExt: Send + Sync {
    /// Raw rendered reverse-proxy configuration
    async fn fetch_proxy_config(&self) -> Result<Vec<u8>, PlatformError>;

    /// Desired state of every service
    async fn fetch_service_state(&self) -> Result<Vec<ServiceState>, PlatformError>;

    /// Claim the oldest pending build job; `None` when the queue is empty
    async fn claim_build_job(&self, worker: &str) -> Result<Option<BuildJob>, PlatformError>;

    async fn update_build_job(&self, id: &str, update: &UpdateBuildJobRequest) -> Result<BuildJob, PlatformError>;

    async fn create_deployment(
        &self,
        service_id: &str,
        request: &DeploymentRequest,
    ) -> Result<Deployment, PlatformError>;

    async fn set_service_compose(&self, service_id: &str, compose: &str) -> Result<(), PlatformError>;
}

#[async_trait]
impl ControlPlaneExt for HttpClient {
    async fn fetch_proxy_config(&self) -> Result<Vec<u8>, PlatformError> {
        self.get_bytes("/v1/traefik/config").await
    }

    async fn fetch_service_state(&self) -> Result<Vec<ServiceState>, PlatformError> {
        let response: ServiceStateResponse = self.get("/v1/state/services").await?;
        Ok(response.services)
    }

    async fn claim_build_job(&self, worker: &str) -> Result<Option<BuildJob>, PlatformError> {
        let request = ClaimRequest {
            worker: worker.to_string(),
        };
        self.post_optional("/v1/build-jobs/claim", &request).await
    }

    async fn update_build_job(&self, id: &str, update: &UpdateBuildJobRequest) -> Result<BuildJob, PlatformError> {
        self.patch(&format!("/v1/build-jobs/{}", id), update).await
    }

    async fn create_deployment(
        &self,
        service_id: &str,
        request: &DeploymentRequest,
    ) -> Result<Deployment, PlatformError> {
        self.post(&format!("/v1/services/{}/deployments", service_id), request)
            .await
    }

    async fn set_service_compose(&self, service_id: &str, compose: &str) -> Result<(), PlatformError> {
        let request = ComposeRequest {
            compose: compose.to_string(),
        };
        let _: HealthResponse = self
            .put(&format!("/v1/service-compose/{}", service_id), &request)
            .await?;
        Ok(())
    }
}
