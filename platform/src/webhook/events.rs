//! Webhook payload extraction

use serde::Deserialize;
use serde_json::Value;

use crate::errors::PlatformError;

#[derive(Debug, Default, Deserialize)]
struct Owner {
    #[serde(default)]
    login: String,
}

#[derive(Debug, Default, Deserialize)]
struct RepositoryPayload {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    default_branch: String,
    #[serde(default)]
    owner: Owner,
}

impl RepositoryPayload {
    fn owner_and_name(&self) -> Option<(String, String)> {
        let mut owner = self.owner.login.trim().to_string();
        let mut name = self.name.trim().to_string();
        if owner.is_empty() || name.is_empty() {
            if let Some((full_owner, full_name)) = self.full_name.split_once('/') {
                if !full_name.contains('/') {
                    if owner.is_empty() {
                        owner = full_owner.trim().to_string();
                    }
                    if name.is_empty() {
                        name = full_name.trim().to_string();
                    }
                }
            }
        }
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some((owner, name))
    }
}

/// Fields of a `push` event used to enqueue a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// `owner/name`, empty when the payload names no repository
    pub repository: String,
    pub git_ref: String,
    /// Head commit after the push
    pub after: String,
}

impl PushEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, PlatformError> {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, rename = "ref")]
            git_ref: String,
            #[serde(default)]
            after: String,
            #[serde(default)]
            repository: RepositoryPayload,
        }

        let body: Body = serde_json::from_slice(payload)?;
        let repo = &body.repository;
        let repository = if !repo.full_name.is_empty() {
            repo.full_name.clone()
        } else if !repo.owner.login.is_empty() && !repo.name.is_empty() {
            format!("{}/{}", repo.owner.login, repo.name)
        } else {
            String::new()
        };

        Ok(Self {
            repository,
            git_ref: body.git_ref,
            after: body.after,
        })
    }
}

/// A repository named by an `installation_repositories` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
}

/// Repositories granted to or revoked from an installation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationRepositoriesEvent {
    pub action: String,
    pub existing: Vec<RepositoryRef>,
    pub added: Vec<RepositoryRef>,
    pub removed: Vec<RepositoryRef>,
}

impl InstallationRepositoriesEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, PlatformError> {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            action: String,
            #[serde(default)]
            repositories: Vec<RepositoryPayload>,
            #[serde(default)]
            repositories_added: Vec<RepositoryPayload>,
            #[serde(default)]
            repositories_removed: Vec<RepositoryPayload>,
        }

        // Entries without a resolvable owner and name are dropped.
        fn convert(repos: Vec<RepositoryPayload>) -> Vec<RepositoryRef> {
            repos
                .into_iter()
                .filter_map(|repo| {
                    let (owner, name) = repo.owner_and_name()?;
                    let default_branch = if repo.default_branch.is_empty() {
                        "main".to_string()
                    } else {
                        repo.default_branch
                    };
                    Some(RepositoryRef {
                        owner,
                        name,
                        default_branch,
                    })
                })
                .collect()
        }

        let body: Body = serde_json::from_slice(payload)?;
        Ok(Self {
            action: body.action,
            existing: convert(body.repositories),
            added: convert(body.repositories_added),
            removed: convert(body.repositories_removed),
        })
    }
}

/// `installation.id` of a payload as a string, if present and non-zero
pub fn extract_installation_id(payload: &[u8]) -> Option<String> {
    let body: Value = serde_json::from_slice(payload).ok()?;
    match body.get("installation")?.get("id")? {
        Value::Number(n) if n.as_i64() != Some(0) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() && s != "0" => Some(s.clone()),
        _ => None,
    }
}
