//! Build job model and lifecycle

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PlatformError;

/// Build job status.
///
/// `pending -> running -> {succeeded, failed}`; a terminal job may be moved
/// back to a non-terminal status to re-run it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            other => Err(PlatformError::ValidationError(format!(
                "unknown build job status: {}",
                other
            ))),
        }
    }
}

/// Unit of asynchronous build work triggered by a repository event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildJob {
    pub id: String,
    /// `owner/name`
    pub repository: String,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    pub commit: String,
    /// External installation id the event came from
    #[serde(default)]
    pub installation: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub worker_id: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub compose_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuildJob {
    /// A fresh pending job. Lifecycle fields are stamped by the store.
    pub fn new(id: impl Into<String>, repository: impl Into<String>, commit: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            repository: repository.into(),
            git_ref: String::new(),
            commit: commit.into(),
            installation: String::new(),
            status: JobStatus::Pending,
            reason: String::new(),
            worker_id: String::new(),
            started_at: None,
            completed_at: None,
            artifacts: Vec::new(),
            service_id: String::new(),
            environment: String::new(),
            compose_path: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp `updated_at` and keep `completed_at` consistent with the status:
    /// set once on entering a terminal status, cleared when leaving it.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        if self.status.is_terminal() {
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.compose_path = self.compose_path.trim().to_string();
    }
}

/// Partial update of a build job; `None` and empty values are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildJobUpdate {
    pub status: Option<JobStatus>,
    pub reason: Option<String>,
    pub artifacts: Option<Vec<String>>,
    pub compose_path: Option<String>,
}

impl BuildJobUpdate {
    /// Build from the wire request, rejecting unknown statuses
    pub fn from_request(request: mdp_api::UpdateBuildJobRequest) -> Result<Self, PlatformError> {
        let status = match request.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse()?),
        };
        Ok(Self {
            status,
            reason: request.reason,
            artifacts: request.artifacts,
            compose_path: request.compose_path,
        })
    }

    pub(crate) fn apply(self, job: &mut BuildJob) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(reason) = self.reason.filter(|r| !r.is_empty()) {
            job.reason = reason;
        }
        if let Some(artifacts) = self.artifacts {
            job.artifacts = artifacts;
        }
        if let Some(compose_path) = self.compose_path.filter(|p| !p.trim().is_empty()) {
            job.compose_path = compose_path;
        }
    }
}
