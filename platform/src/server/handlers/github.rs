//! Repository, installation and webhook routes

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use mdp_api::{InstallationRequest, RepositoryRequest, WebhookResponse};
use serde::Serialize;

use crate::errors::PlatformError;
use crate::models::repository::{installation_id, repository_id};
use crate::models::{Installation, Repository};
use crate::server::handlers::{decode, or_default};
use crate::server::state::ServerState;
use crate::webhook::ingest::DEFAULT_COMPOSE_PATH;
use crate::webhook::{ingest, WebhookDelivery};

const DEFAULT_BRANCH: &str = "main";
const REDACTED: &str = "********";

#[derive(Debug, Serialize)]
pub struct RepositoriesResponse {
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Serialize)]
pub struct InstallationsResponse {
    pub installations: Vec<Installation>,
}

pub async fn list_repositories(State(state): State<Arc<ServerState>>) -> Json<RepositoriesResponse> {
    Json(RepositoriesResponse {
        repositories: state.store.list_repositories().await,
    })
}

pub async fn upsert_repository(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Repository>), PlatformError> {
    let request: RepositoryRequest = decode(&body)?;
    let owner = request.owner.trim().to_string();
    let name = request.name.trim().to_string();
    if owner.is_empty() || name.is_empty() {
        return Err(PlatformError::ValidationError("owner and name required".to_string()));
    }

    let now = Utc::now();
    let repo = Repository {
        id: repository_id(&owner, &name),
        owner,
        name,
        default_branch: or_default(request.default_branch, DEFAULT_BRANCH),
        service_id: request.service_id.trim().to_string(),
        environment: request.environment.trim().to_string(),
        compose_path: or_default(request.compose_path, DEFAULT_COMPOSE_PATH),
        installation: request.installation_id.trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    let repo = state.store.upsert_repository(repo).await?;
    Ok((StatusCode::CREATED, Json(repo)))
}

pub async fn list_installations(State(state): State<Arc<ServerState>>) -> Json<InstallationsResponse> {
    let installations = state
        .store
        .list_installations()
        .await
        .into_iter()
        .map(redact_secret)
        .collect();
    Json(InstallationsResponse { installations })
}

pub async fn upsert_installation(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Installation>), PlatformError> {
    let request: InstallationRequest = decode(&body)?;
    let account = request.account.trim().to_string();
    let external_id = request.external_id.trim().to_string();
    if account.is_empty() || external_id.is_empty() {
        return Err(PlatformError::ValidationError(
            "account and external_id required".to_string(),
        ));
    }

    let now = Utc::now();
    let installation = Installation {
        id: installation_id(&account, &external_id),
        account,
        external_id,
        webhook_secret: request.webhook_secret,
        created_at: now,
        updated_at: now,
    };

    let installation = state.store.upsert_installation(installation).await?;
    Ok((StatusCode::CREATED, Json(redact_secret(installation))))
}

pub async fn webhook(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), PlatformError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let delivery = WebhookDelivery {
        event: header("X-GitHub-Event").unwrap_or_default(),
        delivery_id: header("X-GitHub-Delivery").unwrap_or_default(),
        installation_id: header("X-GitHub-Installation-Id"),
        signature: header("X-Hub-Signature-256"),
        body: body.to_vec(),
    };

    let response = ingest(&state.store, delivery).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

fn redact_secret(mut installation: Installation) -> Installation {
    if !installation.webhook_secret.is_empty() {
        installation.webhook_secret = REDACTED.to_string();
    }
    installation
}
