//! Periodic background workers

pub mod build;
pub mod proxy_config;
pub mod reconcile;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future resolving once shutdown was requested
pub type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Sleep for `duration` unless shutdown comes first. Returns `false` on
/// shutdown.
pub(crate) async fn wait_or_shutdown<S, F>(
    sleep_fn: &S,
    duration: Duration,
    shutdown_signal: &mut ShutdownSignal,
) -> bool
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = shutdown_signal => false,
        _ = sleep_fn(duration) => true,
    }
}
