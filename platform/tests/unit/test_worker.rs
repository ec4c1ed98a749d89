//! Build worker tests against in-memory control plane and builder

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mdp::build::{poll_once, BuildOutput, Builder};
use mdp::errors::PlatformError;
use mdp::http::control_plane::ControlPlaneExt;
use mdp::models::{BuildJob, Deployment};
use mdp::workers::build;
use mdp_api::{DeploymentRequest, ServiceState, UpdateBuildJobRequest};

#[derive(Default)]
struct FakeControlPlane {
    queue: Mutex<Vec<BuildJob>>,
    updates: Mutex<Vec<(String, UpdateBuildJobRequest)>>,
    deployments: Mutex<Vec<(String, DeploymentRequest)>>,
    composes: Mutex<Vec<(String, String)>>,
    reject_deployments: bool,
}

impl FakeControlPlane {
    fn with_job(job: BuildJob) -> Self {
        let plane = Self::default();
        plane.queue.lock().unwrap().push(job);
        plane
    }

    fn last_update(&self) -> UpdateBuildJobRequest {
        self.updates.lock().unwrap().last().cloned().expect("job reported").1
    }
}

#[async_trait]
impl ControlPlaneExt for FakeControlPlane {
    async fn fetch_proxy_config(&self) -> Result<Vec<u8>, PlatformError> {
        Ok(Vec::new())
    }

    async fn fetch_service_state(&self) -> Result<Vec<ServiceState>, PlatformError> {
        Ok(Vec::new())
    }

    async fn claim_build_job(&self, worker: &str) -> Result<Option<BuildJob>, PlatformError> {
        let mut queue = self.queue.lock().unwrap();
        if queue.is_empty() {
            return Ok(None);
        }
        let mut job = queue.remove(0);
        job.worker_id = worker.to_string();
        Ok(Some(job))
    }

    async fn update_build_job(&self, id: &str, update: &UpdateBuildJobRequest) -> Result<BuildJob, PlatformError> {
        self.updates.lock().unwrap().push((id.to_string(), update.clone()));
        Ok(BuildJob::new(id, "acme/web", "c"))
    }

    async fn create_deployment(
        &self,
        service_id: &str,
        request: &DeploymentRequest,
    ) -> Result<Deployment, PlatformError> {
        if self.reject_deployments {
            return Err(PlatformError::ControlPlaneError("503 unavailable".to_string()));
        }
        self.deployments
            .lock()
            .unwrap()
            .push((service_id.to_string(), request.clone()));
        Ok(Deployment {
            id: "dep-1".to_string(),
            service_id: service_id.to_string(),
            environment: request.environment.clone(),
            image: request.image.clone(),
            created_at: Utc::now(),
        })
    }

    async fn set_service_compose(&self, service_id: &str, compose: &str) -> Result<(), PlatformError> {
        self.composes
            .lock()
            .unwrap()
            .push((service_id.to_string(), compose.to_string()));
        Ok(())
    }
}

struct FakeBuilder {
    result: Result<BuildOutput, String>,
}

#[async_trait]
impl Builder for FakeBuilder {
    async fn build(&self, _job: &BuildJob) -> Result<BuildOutput, PlatformError> {
        self.result.clone().map_err(PlatformError::BuildError)
    }
}

fn routed_job() -> BuildJob {
    let mut job = BuildJob::new("job-1", "acme/web", "0123456789abcdef");
    job.service_id = "svc-1".to_string();
    job.compose_path = "docker-compose.yml".to_string();
    job
}

fn built(compose: Option<&str>) -> FakeBuilder {
    FakeBuilder {
        result: Ok(BuildOutput {
            artifacts: vec!["ghcr.io/acme/web:0123456789ab".to_string()],
            compose: compose.map(str::to_string),
        }),
    }
}

#[tokio::test]
async fn test_empty_queue() {
    let plane = FakeControlPlane::default();
    let processed = poll_once(&plane, &built(None), "w1").await.unwrap();

    assert!(processed.is_none());
    assert!(plane.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_successful_build_deploys_and_completes() {
    let plane = FakeControlPlane::with_job(routed_job());
    let compose = "services:\n  web:\n    build: .\n";

    let processed = poll_once(&plane, &built(Some(compose)), "w1").await.unwrap();
    assert_eq!(processed.as_deref(), Some("job-1"));

    let deployments = plane.deployments.lock().unwrap().clone();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].0, "svc-1");
    assert_eq!(deployments[0].1.environment, "production");
    assert_eq!(deployments[0].1.image, "ghcr.io/acme/web:0123456789ab");

    assert_eq!(
        plane.composes.lock().unwrap().clone(),
        vec![("svc-1".to_string(), compose.to_string())]
    );

    let update = plane.last_update();
    assert_eq!(update.status.as_deref(), Some("succeeded"));
    assert_eq!(update.artifacts, Some(vec!["ghcr.io/acme/web:0123456789ab".to_string()]));
    assert_eq!(update.compose_path.as_deref(), Some("docker-compose.yml"));
}

#[tokio::test]
async fn test_unrouted_job_only_builds() {
    let plane = FakeControlPlane::with_job(BuildJob::new("job-2", "acme/lib", "abc"));

    poll_once(&plane, &built(Some("services: {}\n")), "w1").await.unwrap();

    assert!(plane.deployments.lock().unwrap().is_empty());
    assert!(plane.composes.lock().unwrap().is_empty());
    assert_eq!(plane.last_update().status.as_deref(), Some("succeeded"));
}

#[tokio::test]
async fn test_build_failure_marks_job_failed() {
    let plane = FakeControlPlane::with_job(routed_job());
    let builder = FakeBuilder {
        result: Err("docker build exited with 1".to_string()),
    };

    let processed = poll_once(&plane, &builder, "w1").await.unwrap();
    assert_eq!(processed.as_deref(), Some("job-1"));

    let update = plane.last_update();
    assert_eq!(update.status.as_deref(), Some("failed"));
    assert!(update.reason.unwrap().starts_with("build error:"));
    assert!(plane.deployments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_deploy_failure_marks_job_failed() {
    let plane = FakeControlPlane {
        reject_deployments: true,
        ..FakeControlPlane::with_job(routed_job())
    };

    poll_once(&plane, &built(None), "w1").await.unwrap();

    let updates = plane.updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1.status.as_deref(), Some("failed"));
    assert!(updates[0].1.reason.as_deref().unwrap().starts_with("deploy error:"));
}

#[test]
fn test_worker_loop_processes_then_stops_on_shutdown() {
    tokio_test::block_on(async {
        let plane = FakeControlPlane::with_job(routed_job());
        let builder = built(None);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let shutdown_tx = Mutex::new(Some(shutdown_tx));
        let sleeps = AtomicUsize::new(0);

        // The first sleep is the initial delay, the second one requests shutdown.
        let sleep_fn = |_: Duration| -> Pin<Box<dyn Future<Output = ()> + Send>> {
            if sleeps.fetch_add(1, Ordering::SeqCst) == 0 {
                Box::pin(async {})
            } else {
                if let Some(tx) = shutdown_tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                Box::pin(std::future::pending())
            }
        };

        let options = build::Options {
            worker_name: "w-loop".to_string(),
            ..Default::default()
        };
        let shutdown = Box::pin(async move {
            let _ = shutdown_rx.await;
        });
        build::run(&options, &plane, &builder, sleep_fn, shutdown).await;

        assert_eq!(sleeps.load(Ordering::SeqCst), 2);
        assert!(plane.queue.lock().unwrap().is_empty());
        assert_eq!(plane.last_update().status.as_deref(), Some("succeeded"));
    });
}
