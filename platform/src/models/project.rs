//! Project and service models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mdp_api::ServiceState;

/// A logical application grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// A deployable unit within a project.
///
/// A non-empty `compose` makes the agent run the service as a compose stack,
/// otherwise `image` is run as a single container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub internal_port: u16,
    #[serde(default)]
    pub compose: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

impl Service {
    /// Project the service onto the desired-state shape the agent consumes
    pub fn desired_state(&self) -> ServiceState {
        ServiceState {
            id: self.id.clone(),
            project_id: self.project_id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            internal_port: self.internal_port,
            compose: self.compose.clone(),
        }
    }

    /// Replace the deployment of `deployment.environment`, or append it when
    /// the environment has none yet.
    pub fn put_deployment(&mut self, deployment: Deployment) {
        match self
            .deployments
            .iter_mut()
            .find(|d| d.environment == deployment.environment)
        {
            Some(existing) => *existing = deployment,
            None => self.deployments.push(deployment),
        }
    }
}

/// A hostname bound to a service in an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub service_id: String,
    pub environment: String,
    pub hostname: String,
    pub created_at: DateTime<Utc>,
}

/// Desired image of a service in one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub service_id: String,
    pub environment: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}
