//! Entities owned by the state store

pub mod build_job;
pub mod project;
pub mod repository;

pub use build_job::{BuildJob, BuildJobUpdate, JobStatus};
pub use project::{Deployment, Domain, Project, Service};
pub use repository::{Installation, Repository};

/// Environment used when a caller does not name one
pub const DEFAULT_ENVIRONMENT: &str = "production";
