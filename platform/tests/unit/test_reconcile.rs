//! Reconciler tests against an in-memory container runtime

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mdp::errors::PlatformError;
use mdp::filesys::dir::Dir;
use mdp::http::control_plane::ControlPlaneExt;
use chrono::Utc;
use mdp::models::{BuildJob, BuildJobUpdate, Deployment, JobStatus, Project, Service};
use mdp::store::StateStore;
use mdp::reconcile::Reconciler;
use mdp::runtime::{ComposeProject, ContainerInfo, ContainerRuntime, LabeledContainer, RunSpec};
use mdp::workers::reconcile::reconcile_once;
use mdp_api::{DeploymentRequest, ServiceState, UpdateBuildJobRequest};

#[derive(Default)]
struct FakeState {
    containers: HashMap<String, (ContainerInfo, String)>,
    stacks: HashSet<String>,
    failing_images: HashSet<String>,
    calls: Vec<String>,
}

#[derive(Default)]
struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    fn with_container(self, name: &str, image: &str, service_id: &str) -> Self {
        self.state.lock().unwrap().containers.insert(
            name.to_string(),
            (
                ContainerInfo {
                    image: image.to_string(),
                    running: true,
                },
                service_id.to_string(),
            ),
        );
        self
    }

    fn with_stopped_container(self, name: &str, image: &str, service_id: &str) -> Self {
        self.state.lock().unwrap().containers.insert(
            name.to_string(),
            (
                ContainerInfo {
                    image: image.to_string(),
                    running: false,
                },
                service_id.to_string(),
            ),
        );
        self
    }

    fn fail_image(&self, image: &str) {
        self.state.lock().unwrap().failing_images.insert(image.to_string());
    }

    fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().unwrap().calls)
    }

    fn container(&self, name: &str) -> Option<ContainerInfo> {
        self.state.lock().unwrap().containers.get(name).map(|(info, _)| info.clone())
    }

    fn stack_running(&self, project: &str) -> bool {
        self.state.lock().unwrap().stacks.contains(project)
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>, PlatformError> {
        Ok(self.container(name))
    }

    async fn pull(&self, image: &str) -> Result<(), PlatformError> {
        self.state.lock().unwrap().calls.push(format!("pull {}", image));
        Err(PlatformError::RuntimeCommandFailure("registry unreachable".to_string()))
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("run {} {}", spec.name, spec.image));
        if state.failing_images.contains(&spec.image) {
            return Err(PlatformError::RuntimeCommandFailure(format!("cannot start {}", spec.image)));
        }
        state.containers.insert(
            spec.name.clone(),
            (
                ContainerInfo {
                    image: spec.image.clone(),
                    running: true,
                },
                spec.service_id.clone(),
            ),
        );
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("rm {}", name));
        state.containers.remove(name);
        Ok(())
    }

    async fn list_service_containers(&self) -> Result<Vec<LabeledContainer>, PlatformError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .map(|(name, (_, service_id))| LabeledContainer {
                name: name.clone(),
                service_id: service_id.clone(),
            })
            .collect())
    }

    async fn compose_status(&self, project: &ComposeProject) -> Result<bool, PlatformError> {
        Ok(self.stack_running(&project.name))
    }

    async fn compose_up(&self, project: &ComposeProject) -> Result<(), PlatformError> {
        let document = std::fs::read_to_string(&project.file).expect("compose file written before up");
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("up {}", project.name));
        if state.failing_images.iter().any(|image| document.contains(image.as_str())) {
            return Err(PlatformError::RuntimeCommandFailure("pull access denied".to_string()));
        }
        state.stacks.insert(project.name.clone());
        Ok(())
    }

    async fn compose_down(&self, project: &ComposeProject) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("down {}", project.name));
        state.stacks.remove(&project.name);
        Ok(())
    }
}

fn image_service(id: &str, image: &str) -> ServiceState {
    ServiceState {
        id: id.to_string(),
        project_id: "p1".to_string(),
        name: id.to_string(),
        image: image.to_string(),
        internal_port: 8080,
        compose: String::new(),
    }
}

fn compose_service(id: &str, compose: &str) -> ServiceState {
    ServiceState {
        compose: compose.to_string(),
        ..image_service(id, "")
    }
}

fn setup(runtime: FakeRuntime) -> (tempfile::TempDir, Arc<FakeRuntime>, Reconciler<FakeRuntime>) {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(runtime);
    let reconciler = Reconciler::new(runtime.clone(), Dir::new(dir.path().join("compose")));
    (dir, runtime, reconciler)
}

#[tokio::test]
async fn test_starts_missing_container_then_idles() {
    let (_dir, runtime, reconciler) = setup(FakeRuntime::default());
    let services = vec![image_service("api", "nginx:1.25")];

    let report = reconciler.reconcile(&services).await;
    assert_eq!(report.converged, vec!["api".to_string()]);
    assert_eq!(
        runtime.take_calls(),
        vec!["pull nginx:1.25".to_string(), "run svc-api nginx:1.25".to_string()]
    );

    let report = reconciler.reconcile(&services).await;
    assert_eq!(report.unchanged, vec!["api".to_string()]);
    assert!(report.converged.is_empty());
    assert!(runtime.take_calls().is_empty());
}

#[tokio::test]
async fn test_replaces_container_on_image_change() {
    let runtime = FakeRuntime::default().with_container("svc-api", "nginx:1.24", "api");
    let (_dir, runtime, reconciler) = setup(runtime);

    let report = reconciler.reconcile(&[image_service("api", "nginx:1.25")]).await;

    assert_eq!(report.converged, vec!["api".to_string()]);
    assert_eq!(
        runtime.take_calls(),
        vec![
            "pull nginx:1.25".to_string(),
            "rm svc-api".to_string(),
            "run svc-api nginx:1.25".to_string(),
        ]
    );
    assert_eq!(runtime.container("svc-api").unwrap().image, "nginx:1.25");
}

#[tokio::test]
async fn test_removes_containers_no_longer_desired() {
    let runtime = FakeRuntime::default()
        .with_container("svc-api", "nginx:1.25", "api")
        .with_container("svc-old", "redis:7", "old");
    let (_dir, runtime, reconciler) = setup(runtime);

    let report = reconciler.reconcile(&[image_service("api", "nginx:1.25")]).await;

    assert_eq!(report.unchanged, vec!["api".to_string()]);
    assert_eq!(report.removed, vec!["svc-old".to_string()]);
    assert!(runtime.container("svc-old").is_none());
    assert!(runtime.container("svc-api").is_some());
}

#[tokio::test]
async fn test_one_failing_service_does_not_block_others() {
    let (_dir, runtime, reconciler) = setup(FakeRuntime::default());
    runtime.fail_image("broken:1");

    let report = reconciler
        .reconcile(&[
            image_service("bad", "broken:1"),
            image_service("good", "nginx:1.25"),
            image_service("../escape", "nginx:1.25"),
            image_service("empty", ""),
        ])
        .await;

    assert_eq!(report.converged, vec!["good".to_string()]);
    assert_eq!(report.skipped, vec!["empty".to_string()]);
    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["bad", "../escape"]);
    assert!(runtime.container("svc-good").is_some());
}

#[tokio::test]
async fn test_compose_service_lifecycle() {
    let runtime = FakeRuntime::default().with_container("svc-web", "nginx:1.25", "web");
    let (dir, runtime, reconciler) = setup(runtime);
    let compose_file = dir.path().join("compose").join("web").join("docker-compose.yml");
    let v1 = "services:\n  web:\n    image: nginx:1.25\n";
    let v2 = "services:\n  web:\n    image: nginx:1.26\n";

    // Single container migrates to a stack
    let report = reconciler.reconcile(&[compose_service("web", v1)]).await;
    assert_eq!(report.converged, vec!["web".to_string()]);
    assert_eq!(runtime.take_calls(), vec!["rm svc-web".to_string(), "up mdp-web".to_string()]);
    assert_eq!(std::fs::read_to_string(&compose_file).unwrap(), v1);

    // Same document with the stack running is a no-op
    let report = reconciler.reconcile(&[compose_service("web", v1)]).await;
    assert_eq!(report.unchanged, vec!["web".to_string()]);
    assert!(runtime.take_calls().is_empty());

    // New document is written and brought up
    let report = reconciler.reconcile(&[compose_service("web", v2)]).await;
    assert_eq!(report.converged, vec!["web".to_string()]);
    assert_eq!(runtime.take_calls(), vec!["up mdp-web".to_string()]);
    assert_eq!(std::fs::read_to_string(&compose_file).unwrap(), v2);

    // Back to a single image tears the stack down
    let report = reconciler.reconcile(&[image_service("web", "nginx:1.26")]).await;
    assert_eq!(report.converged, vec!["web".to_string()]);
    assert_eq!(
        runtime.take_calls(),
        vec![
            "down mdp-web".to_string(),
            "pull nginx:1.26".to_string(),
            "run svc-web nginx:1.26".to_string(),
        ]
    );
    assert!(!compose_file.exists());
    assert!(!runtime.stack_running("mdp-web"));
}

#[tokio::test]
async fn test_stopped_stack_with_same_document_is_restarted() {
    let (_dir, runtime, reconciler) = setup(FakeRuntime::default());
    let doc = "services:\n  worker:\n    image: busybox\n";

    reconciler.reconcile(&[compose_service("jobs", doc)]).await;
    runtime.take_calls();
    runtime.state.lock().unwrap().stacks.clear();

    let report = reconciler.reconcile(&[compose_service("jobs", doc)]).await;
    assert_eq!(report.converged, vec!["jobs".to_string()]);
    assert_eq!(runtime.take_calls(), vec!["up mdp-jobs".to_string()]);
}

#[tokio::test]
async fn test_failed_compose_up_is_retried() {
    let (dir, runtime, reconciler) = setup(FakeRuntime::default());
    let compose_file = dir.path().join("compose").join("web").join("docker-compose.yml");
    let v1 = "services:\n  web:\n    image: nginx:1.25\n";
    let v2 = "services:\n  web:\n    image: private/nginx:broken\n";
    runtime.fail_image("private/nginx:broken");

    reconciler.reconcile(&[compose_service("web", v1)]).await;
    runtime.take_calls();

    // The v1 stack keeps running while v2 cannot start
    let report = reconciler.reconcile(&[compose_service("web", v2)]).await;
    assert_eq!(report.failed.len(), 1);
    assert_eq!(runtime.take_calls(), vec!["up mdp-web".to_string()]);
    assert!(runtime.stack_running("mdp-web"));
    assert!(!compose_file.exists());

    let report = reconciler.reconcile(&[compose_service("web", v2)]).await;
    assert!(report.unchanged.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(runtime.take_calls(), vec!["up mdp-web".to_string()]);

    runtime.state.lock().unwrap().failing_images.clear();
    let report = reconciler.reconcile(&[compose_service("web", v2)]).await;
    assert_eq!(report.converged, vec!["web".to_string()]);
    assert_eq!(std::fs::read_to_string(&compose_file).unwrap(), v2);
}

#[tokio::test]
async fn test_stopped_container_with_desired_image_is_restarted() {
    let runtime = FakeRuntime::default().with_stopped_container("svc-api", "nginx:1.25", "api");
    let (_dir, runtime, reconciler) = setup(runtime);
    let services = vec![image_service("api", "nginx:1.25")];

    let report = reconciler.reconcile(&services).await;
    assert_eq!(report.converged, vec!["api".to_string()]);
    assert_eq!(
        runtime.take_calls(),
        vec![
            "pull nginx:1.25".to_string(),
            "rm svc-api".to_string(),
            "run svc-api nginx:1.25".to_string(),
        ]
    );
    assert!(runtime.container("svc-api").unwrap().running);

    let report = reconciler.reconcile(&services).await;
    assert_eq!(report.unchanged, vec!["api".to_string()]);
    assert!(runtime.take_calls().is_empty());
}

#[tokio::test]
async fn test_stale_compose_stack_is_torn_down() {
    let (dir, runtime, reconciler) = setup(FakeRuntime::default());
    let stale = dir.path().join("compose").join("gone");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("docker-compose.yml"), "services: {}\n").unwrap();

    let report = reconciler.reconcile(&[]).await;

    assert_eq!(report.removed, vec!["mdp-gone".to_string()]);
    assert_eq!(runtime.take_calls(), vec!["down mdp-gone".to_string()]);
    assert!(!stale.exists());
}

struct UnreachableControlPlane;

#[async_trait]
impl ControlPlaneExt for UnreachableControlPlane {
    async fn fetch_proxy_config(&self) -> Result<Vec<u8>, PlatformError> {
        Err(PlatformError::ControlPlaneError("connection refused".to_string()))
    }

    async fn fetch_service_state(&self) -> Result<Vec<ServiceState>, PlatformError> {
        Err(PlatformError::ControlPlaneError("connection refused".to_string()))
    }

    async fn claim_build_job(&self, _worker: &str) -> Result<Option<BuildJob>, PlatformError> {
        Ok(None)
    }

    async fn update_build_job(&self, id: &str, _update: &UpdateBuildJobRequest) -> Result<BuildJob, PlatformError> {
        Err(PlatformError::NotFound(id.to_string()))
    }

    async fn create_deployment(
        &self,
        service_id: &str,
        _request: &DeploymentRequest,
    ) -> Result<Deployment, PlatformError> {
        Err(PlatformError::NotFound(service_id.to_string()))
    }

    async fn set_service_compose(&self, _service_id: &str, _compose: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_unreachable_control_plane_leaves_runtime_alone() {
    let runtime = FakeRuntime::default().with_container("svc-api", "nginx:1.25", "api");
    let (_dir, runtime, reconciler) = setup(runtime);

    let result = reconcile_once(&UnreachableControlPlane, &reconciler).await;

    assert!(result.is_err());
    assert!(runtime.take_calls().is_empty());
    assert!(runtime.container("svc-api").is_some());
}

#[tokio::test]
async fn test_successful_build_rolls_out_new_image() {
    let (dir, runtime, reconciler) = setup(FakeRuntime::default());
    let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
    let now = Utc::now();

    store
        .create_project(Project {
            id: "P1".to_string(),
            name: "Shop".to_string(),
            slug: "shop".to_string(),
            created_at: now,
        })
        .await
        .unwrap();
    store
        .create_service(Service {
            id: "S1".to_string(),
            project_id: "P1".to_string(),
            name: "web".to_string(),
            image: "nginx:1.0".to_string(),
            internal_port: 80,
            compose: String::new(),
            created_at: now,
            updated_at: now,
            domains: vec![],
            deployments: vec![],
        })
        .await
        .unwrap();

    reconciler.reconcile(&store.desired_services().await).await;
    assert_eq!(runtime.container("svc-S1").unwrap().image, "nginx:1.0");
    runtime.take_calls();

    let mut job = BuildJob::new("J1", "acme/web", "c0ffee");
    job.service_id = "S1".to_string();
    store.create_build_job(job).await.unwrap();
    let claimed = store.claim_next_pending("w1").await.unwrap();
    assert_eq!(claimed.id, "J1");

    store
        .update_build_job_fields(
            "J1",
            BuildJobUpdate {
                status: Some(JobStatus::Succeeded),
                artifacts: Some(vec!["nginx:1.1".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    store
        .set_deployment(
            "S1",
            Deployment {
                id: "D1".to_string(),
                service_id: String::new(),
                environment: claimed.environment.clone(),
                image: "nginx:1.1".to_string(),
                created_at: now,
            },
        )
        .await
        .unwrap();

    let report = reconciler.reconcile(&store.desired_services().await).await;

    assert_eq!(report.converged, vec!["S1".to_string()]);
    assert_eq!(
        runtime.take_calls(),
        vec![
            "pull nginx:1.1".to_string(),
            "rm svc-S1".to_string(),
            "run svc-S1 nginx:1.1".to_string(),
        ]
    );
    assert_eq!(runtime.container("svc-S1").unwrap().image, "nginx:1.1");
    assert_eq!(claimed.environment, "production");
}
