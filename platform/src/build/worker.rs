//! Claim-build-report cycle of the build worker

use mdp_api::{DeploymentRequest, UpdateBuildJobRequest};
use tracing::{error, info, warn};

use crate::build::Builder;
use crate::errors::PlatformError;
use crate::http::control_plane::ControlPlaneExt;
use crate::models::{BuildJob, JobStatus, DEFAULT_ENVIRONMENT};

/// Claim at most one job and process it.
///
/// Returns the ID of the processed job, or `None` when the queue was empty.
/// A failing job is reported to the control plane and is not an error here.
pub async fn poll_once<C, B>(client: &C, builder: &B, worker: &str) -> Result<Option<String>, PlatformError>
where
    C: ControlPlaneExt + ?Sized,
    B: Builder + ?Sized,
{
    let Some(job) = client.claim_build_job(worker).await? else {
        return Ok(None);
    };

    let id = job.id.clone();
    if let Err(e) = process_job(client, builder, job).await {
        error!("Build job {} failed: {}", id, e);
    }
    Ok(Some(id))
}

/// Build a claimed job, publish its outputs and record the final status
pub async fn process_job<C, B>(client: &C, builder: &B, job: BuildJob) -> Result<(), PlatformError>
where
    C: ControlPlaneExt + ?Sized,
    B: Builder + ?Sized,
{
    info!("Processing build job {} ({} @ {})", job.id, job.repository, job.commit);

    let output = match builder.build(&job).await {
        Ok(output) => output,
        Err(e) => {
            report(client, &job, JobStatus::Failed, format!("build error: {}", e), None).await;
            return Err(e);
        }
    };

    if !job.service_id.is_empty() {
        if let Some(compose) = output.compose.as_deref().filter(|c| !c.trim().is_empty()) {
            if let Err(e) = client.set_service_compose(&job.service_id, compose).await {
                warn!("Compose upload for service {} failed: {}", job.service_id, e);
            }
        }

        if let Some(image) = output.artifacts.first() {
            let environment = if job.environment.trim().is_empty() {
                DEFAULT_ENVIRONMENT.to_string()
            } else {
                job.environment.clone()
            };
            let request = DeploymentRequest {
                environment,
                image: image.clone(),
            };
            if let Err(e) = client.create_deployment(&job.service_id, &request).await {
                report(client, &job, JobStatus::Failed, format!("deploy error: {}", e), None).await;
                return Err(e);
            }
            info!("Deployed {} to service {}", image, job.service_id);
        }
    }

    report(client, &job, JobStatus::Succeeded, String::new(), Some(output.artifacts)).await;
    Ok(())
}

async fn report<C>(client: &C, job: &BuildJob, status: JobStatus, reason: String, artifacts: Option<Vec<String>>)
where
    C: ControlPlaneExt + ?Sized,
{
    let update = UpdateBuildJobRequest {
        status: Some(status.to_string()),
        reason: Some(reason).filter(|r| !r.is_empty()),
        artifacts: artifacts.filter(|a| !a.is_empty()),
        compose_path: Some(job.compose_path.clone()).filter(|p| !p.is_empty()),
    };
    if let Err(e) = client.update_build_job(&job.id, &update).await {
        error!("Failed to mark build job {} {}: {}", job.id, status, e);
    }
}
