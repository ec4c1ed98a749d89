//! API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body returned by every failing route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Project creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// Service creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub internal_port: u16,
}

/// Domain creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDomainRequest {
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub hostname: String,
}

/// Deployment request, replaces the deployment of the given environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentRequest {
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub image: String,
}

/// Inline compose specification of a service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeRequest {
    #[serde(default)]
    pub compose: String,
}

/// Desired state of a single service as consumed by the host agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub internal_port: u16,
    #[serde(default)]
    pub compose: String,
}

impl ServiceState {
    /// Whether the service is deployed as a compose stack
    pub fn is_compose(&self) -> bool {
        !self.compose.trim().is_empty()
    }
}

/// Desired state listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStateResponse {
    pub services: Vec<ServiceState>,
}

/// Build job claim request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub worker: String,
}

/// Partial build job update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBuildJobRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_path: Option<String>,
}

/// Build job creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBuildJobRequest {
    #[serde(default)]
    pub repository: String,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub installation: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub compose_path: String,
}

/// Repository registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryRequest {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub compose_path: String,
    #[serde(default)]
    pub installation_id: String,
}

/// Installation registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationRequest {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub webhook_secret: String,
}

/// Webhook acknowledgement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub event: String,
    pub delivery_id: String,
    pub installation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}
