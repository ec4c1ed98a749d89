//! Error types for the platform

use thiserror::Error;

/// Main error type shared by the control plane, the agent and the build worker
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// The build queue holds no pending job. Expected, not a fault.
    #[error("No build job available")]
    NoJobAvailable,

    #[error("Runtime command failed: {0}")]
    RuntimeCommandFailure(String),

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Control plane error: {0}")]
    ControlPlaneError(String),

    #[error("Build error: {0}")]
    BuildError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for PlatformError {
    fn from(err: anyhow::Error) -> Self {
        PlatformError::Internal(err.to_string())
    }
}

impl PlatformError {
    /// Whether the error is the empty-queue signal of the claim protocol
    pub fn is_no_job(&self) -> bool {
        matches!(self, PlatformError::NoJobAvailable)
    }
}
