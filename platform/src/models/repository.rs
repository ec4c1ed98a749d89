//! Source repository and installation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source repository routed to a service for webhook-triggered builds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub compose_path: String,
    #[serde(default, rename = "installation_id")]
    pub installation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Fill every empty field from the previously stored record
    pub(crate) fn inherit_from(&mut self, existing: &Repository) {
        inherit(&mut self.owner, &existing.owner);
        inherit(&mut self.name, &existing.name);
        inherit(&mut self.default_branch, &existing.default_branch);
        inherit(&mut self.service_id, &existing.service_id);
        inherit(&mut self.environment, &existing.environment);
        inherit(&mut self.compose_path, &existing.compose_path);
        inherit(&mut self.installation, &existing.installation);
        self.created_at = existing.created_at;
    }
}

/// An app installation granting access to repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: String,
    pub account: String,
    pub external_id: String,
    #[serde(default)]
    pub webhook_secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installation {
    pub(crate) fn inherit_from(&mut self, existing: &Installation) {
        inherit(&mut self.account, &existing.account);
        inherit(&mut self.external_id, &existing.external_id);
        inherit(&mut self.webhook_secret, &existing.webhook_secret);
        self.created_at = existing.created_at;
    }
}

fn inherit(field: &mut String, existing: &str) {
    if field.trim().is_empty() {
        *field = existing.to_string();
    }
}

/// Lowercase `value` and replace anything outside `[a-z0-9]` with `-`,
/// trimming leading and trailing dashes.
pub fn sanitize_key(value: &str) -> String {
    let mapped: String = value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();
    mapped.trim_matches('-').to_string()
}

/// Store ID of a repository
pub fn repository_id(owner: &str, name: &str) -> String {
    format!("{}-{}", sanitize_key(owner), sanitize_key(name))
}

/// Store ID of an installation
pub fn installation_id(account: &str, external_id: &str) -> String {
    format!("{}-{}", sanitize_key(account), sanitize_key(external_id))
}

/// Split `owner/name` into its two non-empty parts
pub fn split_full_name(full_name: &str) -> Option<(String, String)> {
    let (owner, name) = full_name.split_once('/')?;
    let owner = owner.trim();
    let name = name.trim();
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}
