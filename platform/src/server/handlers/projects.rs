//! Project routes

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use mdp_api::{CreateProjectRequest, CreateServiceRequest};
use serde::Serialize;

use crate::errors::PlatformError;
use crate::models::{Project, Service};
use crate::server::handlers::{decode, require};
use crate::server::state::ServerState;
use crate::utils::{generate_id, slugify};

const DEFAULT_SERVICE_PORT: u16 = 80;

#[derive(Debug, Serialize)]
pub struct ProjectsResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    pub project: Project,
    pub services: Vec<Service>,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<Service>,
}

pub async fn list_projects(State(state): State<Arc<ServerState>>) -> Json<ProjectsResponse> {
    Json(ProjectsResponse {
        projects: state.store.list_projects().await,
    })
}

pub async fn create_project(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Project>), PlatformError> {
    let request: CreateProjectRequest = decode(&body)?;
    require(&request.name, "name required")?;

    let slug = if request.slug.trim().is_empty() {
        slugify(&request.name)
    } else {
        request.slug.trim().to_string()
    };
    let project = Project {
        id: generate_id(),
        name: request.name.trim().to_string(),
        slug,
        created_at: Utc::now(),
    };

    let project = state.store.create_project(project).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectDetailResponse>, PlatformError> {
    let project = state.store.get_project(&project_id).await?;
    let services = state.store.list_project_services(&project_id).await?;
    Ok(Json(ProjectDetailResponse { project, services }))
}

pub async fn list_project_services(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
) -> Result<Json<ServicesResponse>, PlatformError> {
    Ok(Json(ServicesResponse {
        services: state.store.list_project_services(&project_id).await?,
    }))
}

pub async fn create_service(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Service>), PlatformError> {
    let request: CreateServiceRequest = decode(&body)?;
    require(&request.name, "name required")?;

    let now = Utc::now();
    let service = Service {
        id: generate_id(),
        project_id,
        name: request.name.trim().to_string(),
        image: request.image.trim().to_string(),
        internal_port: if request.internal_port == 0 {
            DEFAULT_SERVICE_PORT
        } else {
            request.internal_port
        },
        compose: String::new(),
        created_at: now,
        updated_at: now,
        domains: Vec::new(),
        deployments: Vec::new(),
    };

    let service = state.store.create_service(service).await?;
    Ok((StatusCode::CREATED, Json(service)))
}
