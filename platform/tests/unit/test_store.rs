//! State store tests

use chrono::Utc;
use mdp::errors::PlatformError;
use mdp::models::{BuildJob, Deployment, Domain, Installation, JobStatus, Project, Repository, Service};
use mdp::store::StateStore;

fn project(id: &str) -> Project {
    Project {
        id: id.to_string(),
        name: format!("Project {}", id),
        slug: id.to_string(),
        created_at: Utc::now(),
    }
}

fn service(id: &str, project_id: &str) -> Service {
    let now = Utc::now();
    Service {
        id: id.to_string(),
        project_id: project_id.to_string(),
        name: "web".to_string(),
        image: String::new(),
        internal_port: 80,
        compose: String::new(),
        created_at: now,
        updated_at: now,
        domains: vec![],
        deployments: vec![],
    }
}

fn deployment(environment: &str, image: &str) -> Deployment {
    Deployment {
        id: mdp::utils::generate_id(),
        service_id: String::new(),
        environment: environment.to_string(),
        image: image.to_string(),
        created_at: Utc::now(),
    }
}

fn repository(owner: &str, name: &str) -> Repository {
    let now = Utc::now();
    Repository {
        id: mdp::models::repository::repository_id(owner, name),
        owner: owner.to_string(),
        name: name.to_string(),
        default_branch: String::new(),
        service_id: String::new(),
        environment: String::new(),
        compose_path: String::new(),
        installation: String::new(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_open_creates_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let store = StateStore::open(&path).await.unwrap();

    assert!(path.exists());
    assert!(store.list_projects().await.is_empty());
}

#[tokio::test]
async fn test_open_accepts_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "  \n").unwrap();

    let store = StateStore::open(&path).await.unwrap();
    assert!(store.list_services().await.is_empty());
}

#[tokio::test]
async fn test_open_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(StateStore::open(&path).await.is_err());
}

#[tokio::test]
async fn test_mutations_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let store = StateStore::open(&path).await.unwrap();
        store.create_project(project("p1")).await.unwrap();
        store.create_service(service("s1", "p1")).await.unwrap();
        store.set_deployment("s1", deployment("production", "nginx:1.25")).await.unwrap();
    }

    let store = StateStore::open(&path).await.unwrap();
    let service = store.get_service("s1").await.unwrap();
    assert_eq!(service.project_id, "p1");
    assert_eq!(service.image, "nginx:1.25");
    assert_eq!(service.deployments.len(), 1);
    assert_eq!(store.get_project("p1").await.unwrap().slug, "p1");
}

#[cfg(unix)]
#[tokio::test]
async fn test_snapshot_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = StateStore::open(&path).await.unwrap();
    store.create_project(project("p1")).await.unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn test_duplicate_and_missing_entities() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();

    store.create_project(project("p1")).await.unwrap();
    assert!(matches!(
        store.create_project(project("p1")).await,
        Err(PlatformError::AlreadyExists(_))
    ));
    assert!(matches!(store.get_project("nope").await, Err(PlatformError::NotFound(_))));
    assert!(matches!(
        store.create_service(service("s1", "missing")).await,
        Err(PlatformError::NotFound(_))
    ));
    assert!(matches!(store.get_service("s1").await, Err(PlatformError::NotFound(_))));
    assert!(matches!(
        store.list_project_services("missing").await,
        Err(PlatformError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_deployment_replaces_same_environment() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
    store.create_project(project("p1")).await.unwrap();
    store.create_service(service("s1", "p1")).await.unwrap();

    store.set_deployment("s1", deployment("production", "app:1")).await.unwrap();
    store.set_deployment("s1", deployment("staging", "app:2")).await.unwrap();
    store.set_deployment("s1", deployment("production", "app:3")).await.unwrap();

    let service = store.get_service("s1").await.unwrap();
    assert_eq!(service.deployments.len(), 2);
    let production = service
        .deployments
        .iter()
        .find(|d| d.environment == "production")
        .unwrap();
    assert_eq!(production.image, "app:3");
    assert_eq!(service.image, "app:3");
}

#[tokio::test]
async fn test_domains_and_compose_reach_desired_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
    store.create_project(project("p1")).await.unwrap();
    store.create_service(service("s1", "p1")).await.unwrap();

    let domain = Domain {
        id: "d1".to_string(),
        service_id: String::new(),
        environment: "production".to_string(),
        hostname: "app.example.com".to_string(),
        created_at: Utc::now(),
    };
    let stored = store.add_domain("s1", domain).await.unwrap();
    assert_eq!(stored.service_id, "s1");

    store
        .set_service_compose("s1", "services:\n  web:\n    image: nginx\n".to_string())
        .await
        .unwrap();

    let desired = store.desired_services().await;
    assert_eq!(desired.len(), 1);
    assert!(desired[0].is_compose());
    assert_eq!(store.get_service("s1").await.unwrap().domains.len(), 1);
}

#[tokio::test]
async fn test_repository_upsert_keeps_unset_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();

    let mut first = repository("acme", "web");
    first.service_id = "s1".to_string();
    first.compose_path = "deploy/compose.yml".to_string();
    let created = store.upsert_repository(first).await.unwrap();

    let mut second = repository("acme", "web");
    second.default_branch = "develop".to_string();
    let merged = store.upsert_repository(second).await.unwrap();

    assert_eq!(merged.service_id, "s1");
    assert_eq!(merged.compose_path, "deploy/compose.yml");
    assert_eq!(merged.default_branch, "develop");
    assert_eq!(merged.created_at, created.created_at);

    store.delete_repository(&merged.id).await.unwrap();
    assert!(matches!(
        store.delete_repository(&merged.id).await,
        Err(PlatformError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_persist_leaves_memory_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let store = StateStore::open(data_dir.join("state.json")).await.unwrap();
    store.create_project(project("p1")).await.unwrap();

    // The parent directory becomes a regular file, so every write fails.
    std::fs::remove_dir_all(&data_dir).unwrap();
    std::fs::write(&data_dir, "blocked").unwrap();

    let result = store.create_project(project("p2")).await;
    assert!(matches!(result, Err(PlatformError::PersistenceFailure(_))));

    let projects = store.list_projects().await;
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, "p1");
    assert!(matches!(store.get_project("p2").await, Err(PlatformError::NotFound(_))));
}

#[tokio::test]
async fn test_update_service_keeps_creation_time() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
    store.create_project(project("p1")).await.unwrap();
    let created = store.create_service(service("s1", "p1")).await.unwrap();

    let mut changed = created.clone();
    changed.internal_port = 9000;
    changed.created_at = Utc::now() + chrono::Duration::days(1);
    let updated = store.update_service(changed).await.unwrap();

    assert_eq!(updated.internal_port, 9000);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
    assert!(matches!(
        store.update_service(service("ghost", "p1")).await,
        Err(PlatformError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_update_build_job_replaces_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
    let created = store
        .create_build_job(BuildJob::new("job-1", "acme/web", "c1"))
        .await
        .unwrap();

    let mut job = created.clone();
    job.status = JobStatus::Failed;
    job.reason = "cancelled".to_string();
    let updated = store.update_build_job(job).await.unwrap();

    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.reason, "cancelled");
    assert!(updated.completed_at.is_some());
    assert!(matches!(
        store.update_build_job(BuildJob::new("ghost", "acme/web", "c1")).await,
        Err(PlatformError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_installation_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
    let now = Utc::now();
    let installation = Installation {
        id: "acme-42".to_string(),
        account: "acme".to_string(),
        external_id: "42".to_string(),
        webhook_secret: "s3cret".to_string(),
        created_at: now,
        updated_at: now,
    };
    store.upsert_installation(installation).await.unwrap();

    // Re-registering without a secret keeps the stored one
    let rotated = Installation {
        webhook_secret: String::new(),
        ..store.get_installation("acme-42").await.unwrap()
    };
    store.upsert_installation(rotated).await.unwrap();

    let found = store.find_installation_by_external_id("42").await.unwrap();
    assert_eq!(found.id, "acme-42");
    assert_eq!(found.webhook_secret, "s3cret");
    assert!(matches!(
        store.get_installation("missing").await,
        Err(PlatformError::NotFound(_))
    ));
}
