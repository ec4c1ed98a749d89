//! Webhook delivery handling: authenticate, then turn events into store changes

use mdp_api::WebhookResponse;
use tracing::{info, warn};

use crate::errors::PlatformError;
use crate::models::repository::{repository_id, split_full_name};
use crate::models::{BuildJob, Installation, Repository, DEFAULT_ENVIRONMENT};
use crate::store::StateStore;
use crate::utils::generate_id;
use crate::webhook::events::{
    extract_installation_id, InstallationRepositoriesEvent, PushEvent, RepositoryRef,
};
use crate::webhook::signature::verify_signature;

pub const DEFAULT_COMPOSE_PATH: &str = "docker-compose.yml";

/// One inbound delivery, as read from the request headers and raw body
#[derive(Debug, Clone, Default)]
pub struct WebhookDelivery {
    pub event: String,
    pub delivery_id: String,
    /// `X-GitHub-Installation-Id`, if sent
    pub installation_id: Option<String>,
    /// `X-Hub-Signature-256`, if sent
    pub signature: Option<String>,
    pub body: Vec<u8>,
}

/// Authenticate a delivery and apply it.
///
/// When the installation has a webhook secret the signature must verify. A
/// signature that cannot be checked because no secret is registered is
/// rejected too. Deliveries carrying neither are accepted unverified.
/// Nothing is written to the store for a rejected delivery.
pub async fn ingest(store: &StateStore, delivery: WebhookDelivery) -> Result<WebhookResponse, PlatformError> {
    let installation_id = delivery
        .installation_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| extract_installation_id(&delivery.body))
        .unwrap_or_default();

    let installation = lookup_installation(store, &installation_id).await;
    authenticate(&delivery, installation.as_ref(), &installation_id)?;

    let mut response = WebhookResponse {
        status: "accepted".to_string(),
        event: delivery.event.clone(),
        delivery_id: delivery.delivery_id.clone(),
        installation_id: installation_id.clone(),
        ..Default::default()
    };

    match delivery.event.as_str() {
        "push" => handle_push(store, &delivery, &installation_id, &mut response).await?,
        "installation_repositories" => {
            handle_installation_repositories(store, &delivery, &installation_id, &mut response).await
        }
        other => info!(
            "Received {} event (delivery {})",
            other, delivery.delivery_id
        ),
    }

    Ok(response)
}

async fn lookup_installation(store: &StateStore, installation_id: &str) -> Option<Installation> {
    if installation_id.is_empty() {
        return None;
    }
    match store.find_installation_by_external_id(installation_id).await {
        Ok(installation) => Some(installation),
        Err(PlatformError::NotFound(_)) => None,
        Err(e) => {
            warn!("Lookup of installation {} failed: {}", installation_id, e);
            None
        }
    }
}

fn authenticate(
    delivery: &WebhookDelivery,
    installation: Option<&Installation>,
    installation_id: &str,
) -> Result<(), PlatformError> {
    let signature = delivery.signature.as_deref().unwrap_or_default();
    match installation.filter(|i| !i.webhook_secret.is_empty()) {
        Some(installation) => verify_signature(signature, &delivery.body, &installation.webhook_secret),
        None if !signature.is_empty() => {
            warn!(
                "Rejecting signed delivery {}: no secret registered for installation {:?}",
                delivery.delivery_id, installation_id
            );
            Err(PlatformError::SignatureInvalid(format!(
                "no webhook secret registered for installation {:?}",
                installation_id
            )))
        }
        None => Ok(()),
    }
}

async fn handle_push(
    store: &StateStore,
    delivery: &WebhookDelivery,
    installation_id: &str,
    response: &mut WebhookResponse,
) -> Result<(), PlatformError> {
    let event = match PushEvent::parse(&delivery.body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to parse push payload of delivery {}: {}", delivery.delivery_id, e);
            return Ok(());
        }
    };

    response.repository = Some(event.repository.clone());
    response.git_ref = Some(event.git_ref.clone());
    response.commit = Some(event.after.clone());
    if event.repository.is_empty() || event.after.is_empty() {
        return Ok(());
    }

    let mut job = BuildJob::new(generate_id(), event.repository.clone(), event.after.clone());
    job.git_ref = event.git_ref;
    job.installation = installation_id.to_string();

    match split_full_name(&event.repository) {
        Some((owner, name)) => match store.get_repository(&repository_id(&owner, &name)).await {
            Ok(repo) => {
                job.environment = if !repo.environment.is_empty() {
                    repo.environment
                } else if !repo.service_id.is_empty() {
                    DEFAULT_ENVIRONMENT.to_string()
                } else {
                    String::new()
                };
                job.service_id = repo.service_id;
                job.compose_path = repo.compose_path;
            }
            Err(PlatformError::NotFound(_)) => {}
            Err(e) => warn!("Repository lookup for {} failed: {}", event.repository, e),
        },
        None => warn!("Invalid repository name {}", event.repository),
    }

    let job = store.create_build_job(job).await?;
    info!(
        "Enqueued build job {} for {}@{} (delivery {})",
        job.id, job.repository, job.commit, delivery.delivery_id
    );
    response.build_job_id = Some(job.id);
    Ok(())
}

async fn handle_installation_repositories(
    store: &StateStore,
    delivery: &WebhookDelivery,
    installation_id: &str,
    response: &mut WebhookResponse,
) {
    let event = match InstallationRepositoriesEvent::parse(&delivery.body) {
        Ok(event) => event,
        Err(e) => {
            warn!(
                "Failed to parse installation_repositories payload of delivery {}: {}",
                delivery.delivery_id, e
            );
            return;
        }
    };
    response.action = Some(event.action.clone());

    for repo in event.existing.iter().chain(event.added.iter()) {
        if let Err(e) = store.upsert_repository(registered_repository(repo, installation_id)).await {
            warn!("Failed to register repository {}/{}: {}", repo.owner, repo.name, e);
        }
    }

    for repo in &event.removed {
        match store.delete_repository(&repository_id(&repo.owner, &repo.name)).await {
            Ok(()) | Err(PlatformError::NotFound(_)) => {}
            Err(e) => warn!("Failed to delete repository {}/{}: {}", repo.owner, repo.name, e),
        }
    }
}

fn registered_repository(repo: &RepositoryRef, installation_id: &str) -> Repository {
    let now = chrono::Utc::now();
    Repository {
        id: repository_id(&repo.owner, &repo.name),
        owner: repo.owner.clone(),
        name: repo.name.clone(),
        default_branch: repo.default_branch.clone(),
        service_id: String::new(),
        environment: String::new(),
        compose_path: DEFAULT_COMPOSE_PATH.to_string(),
        installation: installation_id.to_string(),
        created_at: now,
        updated_at: now,
    }
}
