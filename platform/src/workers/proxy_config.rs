//! Worker keeping the reverse-proxy configuration file current

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::errors::PlatformError;
use crate::http::control_plane::ControlPlaneExt;
use crate::reconcile::ProxyConfigWriter;
use crate::workers::{wait_or_shutdown, ShutdownSignal};

/// Proxy config worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Initial delay before first poll
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            initial_delay: Duration::ZERO,
        }
    }
}

/// Fetch the rendered configuration and write it if it changed
pub async fn sync_once<C: ControlPlaneExt + ?Sized>(
    client: &C,
    writer: &ProxyConfigWriter,
) -> Result<bool, PlatformError> {
    let config = client.fetch_proxy_config().await?;
    writer.apply(&config).await
}

/// Run the proxy config worker
pub async fn run<C, S, F>(
    options: &Options,
    client: &C,
    writer: &ProxyConfigWriter,
    sleep_fn: S,
    mut shutdown_signal: ShutdownSignal,
) where
    C: ControlPlaneExt + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Proxy config worker starting...");

    if !wait_or_shutdown(&sleep_fn, options.initial_delay, &mut shutdown_signal).await {
        info!("Proxy config worker shutting down...");
        return;
    }

    loop {
        match sync_once(client, writer).await {
            Ok(true) => {}
            Ok(false) => debug!("Proxy configuration unchanged"),
            Err(e) => error!("Proxy config sync failed: {}", e),
        }

        if !wait_or_shutdown(&sleep_fn, options.interval, &mut shutdown_signal).await {
            info!("Proxy config worker shutting down...");
            return;
        }
    }
}
