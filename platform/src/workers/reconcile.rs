//! Worker converging containers toward the desired services

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::errors::PlatformError;
use crate::http::control_plane::ControlPlaneExt;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::runtime::ContainerRuntime;
use crate::workers::{wait_or_shutdown, ShutdownSignal};

/// Reconcile worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Initial delay before first pass
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            initial_delay: Duration::ZERO,
        }
    }
}

/// One pass: fetch the desired services, then converge.
///
/// A failed fetch aborts the pass before the runtime is touched, so an
/// unreachable control plane never looks like an empty desired state.
pub async fn reconcile_once<C, R>(client: &C, reconciler: &Reconciler<R>) -> Result<ReconcileReport, PlatformError>
where
    C: ControlPlaneExt + ?Sized,
    R: ContainerRuntime,
{
    let services = client.fetch_service_state().await?;
    Ok(reconciler.reconcile(&services).await)
}

/// Run the reconcile worker
pub async fn run<C, R, S, F>(
    options: &Options,
    client: &C,
    reconciler: &Reconciler<R>,
    sleep_fn: S,
    mut shutdown_signal: ShutdownSignal,
) where
    C: ControlPlaneExt + ?Sized,
    R: ContainerRuntime,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Reconcile worker starting...");

    if !wait_or_shutdown(&sleep_fn, options.initial_delay, &mut shutdown_signal).await {
        info!("Reconcile worker shutting down...");
        return;
    }

    loop {
        match reconcile_once(client, reconciler).await {
            Ok(report) => {
                info!(
                    "Reconcile pass: {} converged, {} unchanged, {} skipped, {} failed, {} removed",
                    report.converged.len(),
                    report.unchanged.len(),
                    report.skipped.len(),
                    report.failed.len(),
                    report.removed.len()
                );
                for (service_id, reason) in &report.failed {
                    warn!("Service {} not converged: {}", service_id, reason);
                }
            }
            Err(e) => error!("Reconcile pass aborted: {}", e),
        }

        if !wait_or_shutdown(&sleep_fn, options.interval, &mut shutdown_signal).await {
            info!("Reconcile worker shutting down...");
            return;
        }
    }
}
