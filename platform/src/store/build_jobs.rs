use tracing::info;

use crate::errors::PlatformError;
use crate::models::{BuildJob, BuildJobUpdate, JobStatus, DEFAULT_ENVIRONMENT};
use crate::store::StateStore;

impl StateStore {
    /// Enqueue a build job. Lifecycle fields are reset; the job starts in the
    /// status it was given, `pending` by default.
    pub async fn create_build_job(&self, mut job: BuildJob) -> Result<BuildJob, PlatformError> {
        if job.id.trim().is_empty() {
            return Err(PlatformError::ValidationError("build job id is required".to_string()));
        }
        if job.repository.trim().is_empty() {
            return Err(PlatformError::ValidationError("build job repository is required".to_string()));
        }
        self.mutate(|state, now| {
            if state.build_jobs.contains_key(&job.id) {
                return Err(PlatformError::AlreadyExists(format!("build job {}", job.id)));
            }
            job.worker_id.clear();
            job.started_at = None;
            job.completed_at = None;
            if !job.service_id.is_empty() && job.environment.trim().is_empty() {
                job.environment = DEFAULT_ENVIRONMENT.to_string();
            }
            job.created_at = now;
            job.touch(now);
            state.build_jobs.insert(job.id.clone(), job.clone());
            Ok(job)
        })
        .await
    }

    pub async fn get_build_job(&self, id: &str) -> Result<BuildJob, PlatformError> {
        self.read(|state| {
            state
                .build_jobs
                .get(id)
                .cloned()
                .ok_or_else(|| PlatformError::NotFound(format!("build job {}", id)))
        })
        .await
    }

    /// All build jobs, oldest first
    pub async fn list_build_jobs(&self) -> Vec<BuildJob> {
        let mut jobs: Vec<BuildJob> = self.read(|state| state.build_jobs.values().cloned().collect()).await;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Replace a stored job, keeping its creation time
    pub async fn update_build_job(&self, mut job: BuildJob) -> Result<BuildJob, PlatformError> {
        self.mutate(|state, now| {
            let existing = state
                .build_jobs
                .get(&job.id)
                .ok_or_else(|| PlatformError::NotFound(format!("build job {}", job.id)))?;
            job.created_at = existing.created_at;
            if job.status.is_terminal() && job.completed_at.is_none() {
                job.completed_at = existing.completed_at;
            }
            job.touch(now);
            state.build_jobs.insert(job.id.clone(), job.clone());
            Ok(job)
        })
        .await
    }

    /// Apply a partial update to a stored job
    pub async fn update_build_job_fields(&self, id: &str, update: BuildJobUpdate) -> Result<BuildJob, PlatformError> {
        self.mutate(|state, now| {
            let job = state
                .build_jobs
                .get_mut(id)
                .ok_or_else(|| PlatformError::NotFound(format!("build job {}", id)))?;
            update.apply(job);
            job.touch(now);
            Ok(job.clone())
        })
        .await
    }

    /// Atomically hand the oldest pending job to `worker_id`.
    ///
    /// Selection, the transition to `running` and the snapshot write happen in
    /// one critical section, so two claimers never receive the same job.
    pub async fn claim_next_pending(&self, worker_id: &str) -> Result<BuildJob, PlatformError> {
        let job = self
            .mutate(|state, now| {
                let id = state
                    .build_jobs
                    .values()
                    .filter(|job| job.status == JobStatus::Pending)
                    .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
                    .map(|job| job.id.clone())
                    .ok_or(PlatformError::NoJobAvailable)?;

                let job = state
                    .build_jobs
                    .get_mut(&id)
                    .ok_or_else(|| PlatformError::Internal(format!("build job {} vanished during claim", id)))?;
                job.status = JobStatus::Running;
                job.worker_id = worker_id.to_string();
                job.started_at = Some(now);
                job.touch(now);
                Ok(job.clone())
            })
            .await?;

        info!("Build job {} claimed by {}", job.id, worker_id);
        Ok(job)
    }
}
