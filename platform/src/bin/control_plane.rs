//! Control plane entry point

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use mdp::app::options::{ControlPlaneOptions, ServerOptions, StorageOptions};
use mdp::app::run::run_control_plane;
use mdp::cli::{await_shutdown_signal, version_json, LogArgs};
use mdp::logs::init_logging;

/// Desired-state API for projects, services and build jobs
#[derive(Debug, Parser)]
#[command(name = "mdp-control-plane", disable_version_flag = true)]
struct Cli {
    /// Host to bind to
    #[arg(long, env = "MDP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "MDP_PORT", default_value_t = 8080)]
    port: u16,

    /// Path of the JSON state snapshot
    #[arg(long, env = "MDP_STATE_FILE", default_value = "./data/state.json")]
    state: PathBuf,

    /// Certificate resolver named in proxy routers
    #[arg(long, env = "MDP_LE_RESOLVER", default_value = "le")]
    le_resolver: String,

    /// Print version information and exit
    #[arg(long)]
    version: bool,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version_json());
        return;
    }

    let _log_guard = match init_logging(cli.log.to_options("mdp-control-plane.log")) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = ControlPlaneOptions {
        server: ServerOptions {
            host: cli.host,
            port: cli.port,
        },
        storage: StorageOptions { state_file: cli.state },
        cert_resolver: cli.le_resolver,
        ..Default::default()
    };

    info!("Running control plane with options: {:?}", options);
    if let Err(e) = run_control_plane(options, await_shutdown_signal()).await {
        error!("Control plane failed: {e}");
        std::process::exit(1);
    }
}
