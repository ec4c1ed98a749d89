//! Command-line plumbing shared by the binaries

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::logs::{LogLevel, LogOptions};
use crate::utils::version_info;

/// Logging flags
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(long, env = "MDP_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Emit JSON logs on stdout
    #[arg(long, env = "MDP_LOG_JSON")]
    pub log_json: bool,

    /// Also write daily-rotated JSON logs to this directory
    #[arg(long, env = "MDP_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl LogArgs {
    pub fn to_options(&self, file_prefix: &str) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            json_format: self.log_json,
            log_dir: self.log_dir.clone(),
            file_prefix: file_prefix.to_string(),
            ..Default::default()
        }
    }
}

/// Version info as pretty JSON
pub fn version_json() -> String {
    serde_json::to_string_pretty(&version_info()).unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string())
}

/// Resolve once SIGTERM, SIGINT or Ctrl+C is received
pub async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("SIGTERM received, shutting down..."),
                    _ = sigint.recv() => info!("SIGINT received, shutting down..."),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Unable to install signal handlers, falling back to Ctrl+C: {}", e);
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, shutting down...");
}
