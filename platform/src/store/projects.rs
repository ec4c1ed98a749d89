use mdp_api::ServiceState;

use crate::errors::PlatformError;
use crate::models::{Deployment, Domain, Project, Service};
use crate::store::StateStore;

impl StateStore {
    pub async fn create_project(&self, mut project: Project) -> Result<Project, PlatformError> {
        self.mutate(|state, now| {
            if state.projects.contains_key(&project.id) {
                return Err(PlatformError::AlreadyExists(format!("project {}", project.id)));
            }
            project.created_at = now;
            state.projects.insert(project.id.clone(), project.clone());
            Ok(project)
        })
        .await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, PlatformError> {
        self.read(|state| {
            state
                .projects
                .get(id)
                .cloned()
                .ok_or_else(|| PlatformError::NotFound(format!("project {}", id)))
        })
        .await
    }

    /// All projects, oldest first
    pub async fn list_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self.read(|state| state.projects.values().cloned().collect()).await;
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        projects
    }

    /// Create a service. The owning project must already exist.
    pub async fn create_service(&self, mut service: Service) -> Result<Service, PlatformError> {
        self.mutate(|state, now| {
            if !state.projects.contains_key(&service.project_id) {
                return Err(PlatformError::NotFound(format!("project {}", service.project_id)));
            }
            if state.services.contains_key(&service.id) {
                return Err(PlatformError::AlreadyExists(format!("service {}", service.id)));
            }
            service.created_at = now;
            service.updated_at = now;
            state.services.insert(service.id.clone(), service.clone());
            Ok(service)
        })
        .await
    }

    pub async fn get_service(&self, id: &str) -> Result<Service, PlatformError> {
        self.read(|state| {
            state
                .services
                .get(id)
                .cloned()
                .ok_or_else(|| PlatformError::NotFound(format!("service {}", id)))
        })
        .await
    }

    /// All services, oldest first
    pub async fn list_services(&self) -> Vec<Service> {
        let mut services: Vec<Service> = self.read(|state| state.services.values().cloned().collect()).await;
        services.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        services
    }

    pub async fn list_project_services(&self, project_id: &str) -> Result<Vec<Service>, PlatformError> {
        self.get_project(project_id).await?;
        Ok(self
            .list_services()
            .await
            .into_iter()
            .filter(|s| s.project_id == project_id)
            .collect())
    }

    /// Replace a stored service, keeping its creation time
    pub async fn update_service(&self, mut service: Service) -> Result<Service, PlatformError> {
        self.mutate(|state, now| {
            let existing = state
                .services
                .get(&service.id)
                .ok_or_else(|| PlatformError::NotFound(format!("service {}", service.id)))?;
            service.created_at = existing.created_at;
            service.updated_at = now;
            state.services.insert(service.id.clone(), service.clone());
            Ok(service)
        })
        .await
    }

    /// Append a domain to a service
    pub async fn add_domain(&self, service_id: &str, mut domain: Domain) -> Result<Domain, PlatformError> {
        self.mutate(|state, now| {
            let service = state
                .services
                .get_mut(service_id)
                .ok_or_else(|| PlatformError::NotFound(format!("service {}", service_id)))?;
            domain.service_id = service_id.to_string();
            domain.created_at = now;
            service.domains.push(domain.clone());
            service.updated_at = now;
            Ok(domain)
        })
        .await
    }

    /// Record the desired image of a service in one environment, replacing any
    /// previous deployment of that environment. The service image follows the
    /// latest deployment.
    pub async fn set_deployment(
        &self,
        service_id: &str,
        mut deployment: Deployment,
    ) -> Result<Deployment, PlatformError> {
        self.mutate(|state, now| {
            let service = state
                .services
                .get_mut(service_id)
                .ok_or_else(|| PlatformError::NotFound(format!("service {}", service_id)))?;
            deployment.service_id = service_id.to_string();
            deployment.created_at = now;
            service.image = deployment.image.clone();
            service.put_deployment(deployment.clone());
            service.updated_at = now;
            Ok(deployment)
        })
        .await
    }

    /// Replace the compose document of a service. An empty document switches
    /// the service back to single-container mode.
    pub async fn set_service_compose(&self, service_id: &str, compose: String) -> Result<Service, PlatformError> {
        self.mutate(|state, now| {
            let service = state
                .services
                .get_mut(service_id)
                .ok_or_else(|| PlatformError::NotFound(format!("service {}", service_id)))?;
            service.compose = compose;
            service.updated_at = now;
            Ok(service.clone())
        })
        .await
    }

    /// Desired state of every service, as served to host agents
    pub async fn desired_services(&self) -> Vec<ServiceState> {
        self.list_services().await.iter().map(Service::desired_state).collect()
    }
}
