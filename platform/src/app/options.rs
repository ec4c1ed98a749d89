//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::build::DockerBuilderOptions;
use crate::workers::{build, proxy_config, reconcile};

pub const DEFAULT_CONTROL_PLANE_URL: &str = "http://localhost:8080";

/// Control-plane process options
#[derive(Debug, Clone)]
pub struct ControlPlaneOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Storage configuration
    pub storage: StorageOptions,

    /// ACME resolver named in rendered proxy routers
    pub cert_resolver: String,
}

impl Default for ControlPlaneOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions::default(),
            storage: StorageOptions::default(),
            cert_resolver: crate::proxy::DEFAULT_CERT_RESOLVER.to_string(),
        }
    }
}

/// Host agent options
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Control plane base URL
    pub control_plane_url: String,

    /// Where the rendered proxy configuration is written
    pub proxy_config_path: PathBuf,

    /// Parent directory of per-service compose stacks
    pub compose_dir: PathBuf,

    /// Container engine CLI
    pub docker_binary: String,

    /// Proxy config worker options
    pub proxy_config_worker: proxy_config::Options,

    /// Reconcile worker options
    pub reconcile_worker: reconcile::Options,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.to_string(),
            proxy_config_path: PathBuf::from("./traefik.yml"),
            compose_dir: PathBuf::from("./compose"),
            docker_binary: "docker".to_string(),
            proxy_config_worker: proxy_config::Options::default(),
            reconcile_worker: reconcile::Options::default(),
        }
    }
}

/// Build worker process options
#[derive(Debug, Clone)]
pub struct BuildWorkerOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Control plane base URL
    pub control_plane_url: String,

    /// Docker builder options
    pub builder: DockerBuilderOptions,

    /// Build worker loop options
    pub worker: build::Options,
}

impl Default for BuildWorkerOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.to_string(),
            builder: DockerBuilderOptions::default(),
            worker: build::Options::default(),
        }
    }
}

/// Lifecycle options shared by every process
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Storage configuration options
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// JSON snapshot of the desired state
    pub state_file: PathBuf,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("./data/state.json"),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}
