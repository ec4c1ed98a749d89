//! Service routes: domains, deployments and compose documents

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use mdp_api::{ComposeRequest, CreateDomainRequest, DeploymentRequest, HealthResponse};
use serde::Serialize;

use crate::errors::PlatformError;
use crate::models::{Deployment, Domain, Service, DEFAULT_ENVIRONMENT};
use crate::server::handlers::{decode, or_default, require};
use crate::server::state::ServerState;
use crate::utils::generate_id;

#[derive(Debug, Serialize)]
pub struct DomainsResponse {
    pub domains: Vec<Domain>,
}

#[derive(Debug, Serialize)]
pub struct DeploymentsResponse {
    pub deployments: Vec<Deployment>,
}

pub async fn get_service(
    State(state): State<Arc<ServerState>>,
    Path(service_id): Path<String>,
) -> Result<Json<Service>, PlatformError> {
    Ok(Json(state.store.get_service(&service_id).await?))
}

pub async fn list_domains(
    State(state): State<Arc<ServerState>>,
    Path(service_id): Path<String>,
) -> Result<Json<DomainsResponse>, PlatformError> {
    let service = state.store.get_service(&service_id).await?;
    Ok(Json(DomainsResponse {
        domains: service.domains,
    }))
}

pub async fn add_domain(
    State(state): State<Arc<ServerState>>,
    Path(service_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Domain>), PlatformError> {
    let request: CreateDomainRequest = decode(&body)?;
    require(&request.hostname, "hostname required")?;

    let domain = Domain {
        id: generate_id(),
        service_id: service_id.clone(),
        environment: or_default(request.environment, DEFAULT_ENVIRONMENT),
        hostname: request.hostname.trim().to_string(),
        created_at: Utc::now(),
    };

    let domain = state.store.add_domain(&service_id, domain).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

pub async fn list_deployments(
    State(state): State<Arc<ServerState>>,
    Path(service_id): Path<String>,
) -> Result<Json<DeploymentsResponse>, PlatformError> {
    let service = state.store.get_service(&service_id).await?;
    Ok(Json(DeploymentsResponse {
        deployments: service.deployments,
    }))
}

pub async fn create_deployment(
    State(state): State<Arc<ServerState>>,
    Path(service_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Deployment>), PlatformError> {
    let request: DeploymentRequest = decode(&body)?;
    require(&request.image, "image required")?;

    let deployment = Deployment {
        id: generate_id(),
        service_id: service_id.clone(),
        environment: or_default(request.environment, DEFAULT_ENVIRONMENT),
        image: request.image.trim().to_string(),
        created_at: Utc::now(),
    };

    let deployment = state.store.set_deployment(&service_id, deployment).await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

pub async fn get_compose(
    State(state): State<Arc<ServerState>>,
    Path(service_id): Path<String>,
) -> Result<Json<ComposeRequest>, PlatformError> {
    let service = state.store.get_service(&service_id).await?;
    Ok(Json(ComposeRequest {
        compose: service.compose,
    }))
}

pub async fn put_compose(
    State(state): State<Arc<ServerState>>,
    Path(service_id): Path<String>,
    body: Bytes,
) -> Result<Json<HealthResponse>, PlatformError> {
    let request: ComposeRequest = decode(&body)?;
    state.store.set_service_compose(&service_id, request.compose).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
