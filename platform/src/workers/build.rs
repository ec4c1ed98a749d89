//! Worker polling the build queue

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::build::{poll_once, Builder};
use crate::http::control_plane::ControlPlaneExt;
use crate::workers::{wait_or_shutdown, ShutdownSignal};

/// Build worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Name reported when claiming jobs
    pub worker_name: String,

    /// Polling interval
    pub interval: Duration,

    /// Initial delay before first poll
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            worker_name: "builder-local".to_string(),
            interval: Duration::from_secs(5),
            initial_delay: Duration::ZERO,
        }
    }
}

/// Run the build worker
pub async fn run<C, B, S, F>(
    options: &Options,
    client: &C,
    builder: &B,
    sleep_fn: S,
    mut shutdown_signal: ShutdownSignal,
) where
    C: ControlPlaneExt + ?Sized,
    B: Builder + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(
        "Build worker {} starting, polling every {:?}...",
        options.worker_name, options.interval
    );

    if !wait_or_shutdown(&sleep_fn, options.initial_delay, &mut shutdown_signal).await {
        info!("Build worker shutting down...");
        return;
    }

    loop {
        match poll_once(client, builder, &options.worker_name).await {
            Ok(Some(job_id)) => debug!("Finished build job {}", job_id),
            Ok(None) => debug!("No build job available"),
            Err(e) => error!("Claim failed: {}", e),
        }

        if !wait_or_shutdown(&sleep_fn, options.interval, &mut shutdown_signal).await {
            info!("Build worker shutting down...");
            return;
        }
    }
}
