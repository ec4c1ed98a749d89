use crate::errors::PlatformError;
use crate::models::{Installation, Repository};
use crate::store::StateStore;

impl StateStore {
    /// Insert or merge a repository. Empty incoming fields keep the stored
    /// value and the original creation time survives.
    pub async fn upsert_repository(&self, mut repo: Repository) -> Result<Repository, PlatformError> {
        if repo.id.trim().is_empty() {
            return Err(PlatformError::ValidationError("repository id is required".to_string()));
        }
        self.mutate(|state, now| {
            match state.repos.get(&repo.id) {
                Some(existing) => repo.inherit_from(existing),
                None => repo.created_at = now,
            }
            repo.updated_at = now;
            state.repos.insert(repo.id.clone(), repo.clone());
            Ok(repo)
        })
        .await
    }

    pub async fn get_repository(&self, id: &str) -> Result<Repository, PlatformError> {
        self.read(|state| {
            state
                .repos
                .get(id)
                .cloned()
                .ok_or_else(|| PlatformError::NotFound(format!("repository {}", id)))
        })
        .await
    }

    pub async fn list_repositories(&self) -> Vec<Repository> {
        self.read(|state| state.repos.values().cloned().collect()).await
    }

    pub async fn delete_repository(&self, id: &str) -> Result<(), PlatformError> {
        self.mutate(|state, _| {
            state
                .repos
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| PlatformError::NotFound(format!("repository {}", id)))
        })
        .await
    }

    /// Insert or merge an installation, inheriting empty fields
    pub async fn upsert_installation(&self, mut installation: Installation) -> Result<Installation, PlatformError> {
        if installation.id.trim().is_empty() {
            return Err(PlatformError::ValidationError("installation id is required".to_string()));
        }
        self.mutate(|state, now| {
            match state.installations.get(&installation.id) {
                Some(existing) => installation.inherit_from(existing),
                None => installation.created_at = now,
            }
            installation.updated_at = now;
            state
                .installations
                .insert(installation.id.clone(), installation.clone());
            Ok(installation)
        })
        .await
    }

    pub async fn get_installation(&self, id: &str) -> Result<Installation, PlatformError> {
        self.read(|state| {
            state
                .installations
                .get(id)
                .cloned()
                .ok_or_else(|| PlatformError::NotFound(format!("installation {}", id)))
        })
        .await
    }

    pub async fn list_installations(&self) -> Vec<Installation> {
        self.read(|state| state.installations.values().cloned().collect()).await
    }

    pub async fn find_installation_by_external_id(&self, external_id: &str) -> Result<Installation, PlatformError> {
        self.read(|state| {
            state
                .installations
                .values()
                .find(|i| i.external_id == external_id)
                .cloned()
                .ok_or_else(|| PlatformError::NotFound(format!("installation with external id {}", external_id)))
        })
        .await
    }
}
