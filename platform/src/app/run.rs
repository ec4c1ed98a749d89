//! Process run loops of the control plane, the host agent and the build worker

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AgentOptions, BuildWorkerOptions, ControlPlaneOptions, LifecycleOptions};
use crate::build::DockerBuilder;
use crate::errors::PlatformError;
use crate::filesys::{dir::Dir, file::File};
use crate::http::client::HttpClient;
use crate::reconcile::{ProxyConfigWriter, Reconciler};
use crate::runtime::DockerCli;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::store::StateStore;
use crate::workers::{build, proxy_config, reconcile, ShutdownSignal};

/// Run the control plane until `shutdown_signal` resolves
pub async fn run_control_plane(
    options: ControlPlaneOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), PlatformError> {
    info!("Initializing control plane...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init_control_plane(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start control plane: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

async fn init_control_plane(
    options: &ControlPlaneOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), PlatformError> {
    let store = Arc::new(StateStore::open(options.storage.state_file.clone()).await?);
    let state = Arc::new(ServerState::new(store, options.cert_resolver.clone()));

    let mut shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(&options.server, state, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)
}

/// Run the host agent until `shutdown_signal` resolves
pub async fn run_agent(
    options: AgentOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), PlatformError> {
    info!("Initializing host agent against {}...", options.control_plane_url);

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init_agent(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start agent: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

async fn init_agent(
    options: &AgentOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), PlatformError> {
    let client = Arc::new(HttpClient::new(&options.control_plane_url)?);

    let compose_dir = Dir::new(options.compose_dir.clone());
    compose_dir.create().await?;

    info!("Initializing proxy config worker...");
    let writer = ProxyConfigWriter::new(File::new(options.proxy_config_path.clone()));
    let worker_options = options.proxy_config_worker.clone();
    let worker_client = client.clone();
    let shutdown = shutdown_future(shutdown_tx);
    let proxy_handle = tokio::spawn(async move {
        proxy_config::run(
            &worker_options,
            worker_client.as_ref(),
            &writer,
            tokio::time::sleep,
            shutdown,
        )
        .await;
    });
    shutdown_manager.with_proxy_config_worker_handle(proxy_handle)?;

    info!("Initializing reconcile worker...");
    let runtime = Arc::new(DockerCli::new(options.docker_binary.clone()));
    let reconciler = Reconciler::new(runtime, compose_dir);
    let worker_options = options.reconcile_worker.clone();
    let shutdown = shutdown_future(shutdown_tx);
    let reconcile_handle = tokio::spawn(async move {
        reconcile::run(
            &worker_options,
            client.as_ref(),
            &reconciler,
            tokio::time::sleep,
            shutdown,
        )
        .await;
    });
    shutdown_manager.with_reconcile_worker_handle(reconcile_handle)
}

/// Run the build worker until `shutdown_signal` resolves
pub async fn run_build_worker(
    options: BuildWorkerOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), PlatformError> {
    info!("Initializing build worker {}...", options.worker.worker_name);

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init_build_worker(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start build worker: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

async fn init_build_worker(
    options: &BuildWorkerOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), PlatformError> {
    let client = HttpClient::new(&options.control_plane_url)?;
    options.builder.workspace.create().await?;
    let builder = DockerBuilder::new(options.builder.clone());

    let worker_options = options.worker.clone();
    let shutdown = shutdown_future(shutdown_tx);
    let handle = tokio::spawn(async move {
        build::run(&worker_options, &client, &builder, tokio::time::sleep, shutdown).await;
    });
    shutdown_manager.with_build_worker_handle(handle)
}

fn shutdown_future(shutdown_tx: &broadcast::Sender<()>) -> ShutdownSignal {
    let mut shutdown_rx = shutdown_tx.subscribe();
    Box::pin(async move {
        let _ = shutdown_rx.recv().await;
    })
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    server_handle: Option<JoinHandle<Result<(), PlatformError>>>,
    proxy_config_worker_handle: Option<JoinHandle<()>>,
    reconcile_worker_handle: Option<JoinHandle<()>>,
    build_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            server_handle: None,
            proxy_config_worker_handle: None,
            reconcile_worker_handle: None,
            build_worker_handle: None,
        }
    }

    pub fn with_server_handle(&mut self, handle: JoinHandle<Result<(), PlatformError>>) -> Result<(), PlatformError> {
        if self.server_handle.is_some() {
            return Err(PlatformError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub fn with_proxy_config_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), PlatformError> {
        if self.proxy_config_worker_handle.is_some() {
            return Err(PlatformError::ShutdownError(
                "proxy_config_worker_handle already set".to_string(),
            ));
        }
        self.proxy_config_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_reconcile_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), PlatformError> {
        if self.reconcile_worker_handle.is_some() {
            return Err(PlatformError::ShutdownError(
                "reconcile_worker_handle already set".to_string(),
            ));
        }
        self.reconcile_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_build_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), PlatformError> {
        if self.build_worker_handle.is_some() {
            return Err(PlatformError::ShutdownError("build_worker_handle already set".to_string()));
        }
        self.build_worker_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), PlatformError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.lifecycle_options.max_shutdown_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                );
                Err(PlatformError::ShutdownError(format!(
                    "timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                )))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), PlatformError> {
        info!("Shutting down...");

        // Workers finish their current tick before observing the signal.
        for handle in [
            self.proxy_config_worker_handle.take(),
            self.reconcile_worker_handle.take(),
            self.build_worker_handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.await.map_err(|e| PlatformError::ShutdownError(e.to_string()))?;
        }

        if let Some(handle) = self.server_handle.take() {
            handle.await.map_err(|e| PlatformError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
