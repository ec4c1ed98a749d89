//! Build job queue routes

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mdp_api::{ClaimRequest, CreateBuildJobRequest, UpdateBuildJobRequest};
use serde::Serialize;

use crate::errors::PlatformError;
use crate::models::{BuildJob, BuildJobUpdate, JobStatus};
use crate::server::handlers::{decode, require};
use crate::server::state::ServerState;
use crate::utils::generate_id;

#[derive(Debug, Serialize)]
pub struct BuildJobsResponse {
    pub build_jobs: Vec<BuildJob>,
}

pub async fn list_build_jobs(State(state): State<Arc<ServerState>>) -> Json<BuildJobsResponse> {
    Json(BuildJobsResponse {
        build_jobs: state.store.list_build_jobs().await,
    })
}

pub async fn create_build_job(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<BuildJob>), PlatformError> {
    let request: CreateBuildJobRequest = decode(&body)?;
    require(&request.repository, "repository and commit required")?;
    require(&request.commit, "repository and commit required")?;

    let status = if request.status.trim().is_empty() {
        JobStatus::Pending
    } else {
        request.status.parse()?
    };

    let mut job = BuildJob::new(generate_id(), request.repository.trim(), request.commit.trim());
    job.git_ref = request.git_ref;
    job.installation = request.installation;
    job.status = status;
    job.service_id = request.service_id;
    job.environment = request.environment;
    job.artifacts = request.artifacts;
    job.compose_path = request.compose_path;

    let job = state.store.create_build_job(job).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_build_job(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> Result<Json<BuildJob>, PlatformError> {
    Ok(Json(state.store.get_build_job(&job_id).await?))
}

pub async fn update_build_job(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> Result<Json<BuildJob>, PlatformError> {
    let request: UpdateBuildJobRequest = decode(&body)?;
    let update = BuildJobUpdate::from_request(request)?;
    Ok(Json(state.store.update_build_job_fields(&job_id, update).await?))
}

/// Hand the oldest pending job to the calling worker; `204` when the queue is
/// empty.
pub async fn claim_build_job(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Response, PlatformError> {
    let request: ClaimRequest = decode(&body)?;
    let worker = if request.worker.trim().is_empty() {
        format!("worker-{}", generate_id())
    } else {
        request.worker.trim().to_string()
    };

    match state.store.claim_next_pending(&worker).await {
        Ok(job) => Ok(Json(job).into_response()),
        Err(PlatformError::NoJobAvailable) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e),
    }
}
