//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::PlatformError;
use crate::server::handlers::{
    build_jobs, github, health_handler, projects, services, state, version_handler,
};
use crate::server::state::ServerState;

/// Build the control-plane router
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/healthz", get(health_handler))
        .route("/version", get(version_handler))
        // Projects
        .route(
            "/v1/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/v1/projects/{id}", get(projects::get_project))
        .route(
            "/v1/projects/{id}/services",
            get(projects::list_project_services).post(projects::create_service),
        )
        // Services
        .route("/v1/services/{id}", get(services::get_service))
        .route(
            "/v1/services/{id}/domains",
            get(services::list_domains).post(services::add_domain),
        )
        .route(
            "/v1/services/{id}/deployments",
            get(services::list_deployments).post(services::create_deployment),
        )
        .route(
            "/v1/service-compose/{id}",
            get(services::get_compose)
                .put(services::put_compose)
                .post(services::put_compose),
        )
        // Desired state for agents
        .route("/v1/state/services", get(state::service_state))
        .route("/v1/traefik/config", get(state::traefik_config))
        // Build jobs
        .route(
            "/v1/build-jobs",
            get(build_jobs::list_build_jobs).post(build_jobs::create_build_job),
        )
        .route("/v1/build-jobs/claim", post(build_jobs::claim_build_job))
        .route(
            "/v1/build-jobs/{id}",
            get(build_jobs::get_build_job)
                .patch(build_jobs::update_build_job)
                .post(build_jobs::update_build_job),
        )
        // Source control
        .route(
            "/v1/github/repos",
            get(github::list_repositories).post(github::upsert_repository),
        )
        .route(
            "/v1/github/installations",
            get(github::list_installations).post(github::upsert_installation),
        )
        .route("/v1/github/webhook", post(github::webhook))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), PlatformError>>, PlatformError> {
    let app = build_router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| PlatformError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| PlatformError::ServerError(e.to_string()))
    });

    Ok(handle)
}
