//! Utility functions

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Version information of the running binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Random identifier for new entities
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lowercase hex SHA256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Derive a URL slug from a display name
pub fn slugify(name: &str) -> String {
    crate::models::repository::sanitize_key(name)
}
