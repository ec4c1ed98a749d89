//! Desired-state routes polled by host agents

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use mdp_api::ServiceStateResponse;

use crate::errors::PlatformError;
use crate::proxy::render_traefik_config;
use crate::server::state::ServerState;

pub async fn service_state(State(state): State<Arc<ServerState>>) -> Json<ServiceStateResponse> {
    Json(ServiceStateResponse {
        services: state.store.desired_services().await,
    })
}

pub async fn traefik_config(State(state): State<Arc<ServerState>>) -> Result<impl IntoResponse, PlatformError> {
    let services = state.store.list_services().await;
    let config = render_traefik_config(&services, &state.cert_resolver)?;
    Ok(([(header::CONTENT_TYPE, "application/x-yaml")], config))
}
