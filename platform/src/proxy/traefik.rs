//! Traefik dynamic configuration rendered from the desired state

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::PlatformError;
use crate::models::repository::sanitize_key;
use crate::models::Service;
use crate::utils::generate_id;

pub const DEFAULT_CERT_RESOLVER: &str = "le";
const DEFAULT_PORT: u16 = 80;
const ENTRY_POINT: &str = "websecure";

#[derive(Debug, Serialize)]
struct DynamicConfig {
    http: HttpConfig,
}

#[derive(Debug, Serialize)]
struct HttpConfig {
    routers: BTreeMap<String, Router>,
    services: BTreeMap<String, LoadBalancedService>,
}

#[derive(Debug, Serialize)]
struct Router {
    rule: String,
    service: String,
    #[serde(rename = "entryPoints")]
    entry_points: Vec<String>,
    tls: RouterTls,
}

#[derive(Debug, Serialize)]
struct RouterTls {
    #[serde(rename = "certResolver")]
    cert_resolver: String,
}

#[derive(Debug, Serialize)]
struct LoadBalancedService {
    #[serde(rename = "loadBalancer")]
    load_balancer: LoadBalancer,
}

#[derive(Debug, Serialize)]
struct LoadBalancer {
    servers: Vec<Server>,
}

#[derive(Debug, Serialize)]
struct Server {
    url: String,
}

/// Render routers and load-balanced services for every service domain.
///
/// Output is deterministic: routers and services are emitted in key order, so
/// the same desired state always yields the same bytes.
pub fn render_traefik_config(services: &[Service], resolver: &str) -> Result<String, PlatformError> {
    let resolver = if resolver.trim().is_empty() {
        DEFAULT_CERT_RESOLVER
    } else {
        resolver.trim()
    };

    let mut http = HttpConfig {
        routers: BTreeMap::new(),
        services: BTreeMap::new(),
    };

    for service in services {
        let mut key = sanitize_key(&service.name);
        if key.is_empty() {
            key = sanitize_key(&service.id);
        }
        let port = if service.internal_port == 0 {
            DEFAULT_PORT
        } else {
            service.internal_port
        };

        http.services.insert(
            key.clone(),
            LoadBalancedService {
                load_balancer: LoadBalancer {
                    servers: vec![Server {
                        url: format!("http://127.0.0.1:{}", port),
                    }],
                },
            },
        );

        for domain in &service.domains {
            let mut router_name = format!(
                "{}-{}-{}",
                key,
                sanitize_key(&domain.environment),
                sanitize_key(&domain.hostname)
            );
            if http.routers.contains_key(&router_name) {
                router_name = format!("{}-{}", router_name, generate_id());
            }
            http.routers.insert(
                router_name,
                Router {
                    rule: format!("Host(`{}`)", domain.hostname),
                    service: key.clone(),
                    entry_points: vec![ENTRY_POINT.to_string()],
                    tls: RouterTls {
                        cert_resolver: resolver.to_string(),
                    },
                },
            );
        }
    }

    serde_yaml::to_string(&DynamicConfig { http })
        .map_err(|e| PlatformError::Internal(format!("failed to render traefik config: {}", e)))
}
