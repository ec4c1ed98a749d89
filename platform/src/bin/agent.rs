//! Host agent entry point

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use mdp::app::options::AgentOptions;
use mdp::app::run::run_agent;
use mdp::cli::{await_shutdown_signal, version_json, LogArgs};
use mdp::logs::init_logging;
use mdp::workers::{proxy_config, reconcile};

/// Converges local containers and the proxy configuration toward the control plane
#[derive(Debug, Parser)]
#[command(name = "mdp-agent", disable_version_flag = true)]
struct Cli {
    /// Control plane base URL
    #[arg(long, env = "CONTROL_PLANE_URL", default_value = "http://localhost:8080")]
    control_plane: String,

    /// Output path of the proxy dynamic configuration
    #[arg(long, env = "TRAEFIK_DYNAMIC_PATH", default_value = "./traefik.yml")]
    traefik_file: PathBuf,

    /// Proxy configuration polling interval, in seconds
    #[arg(long, env = "AGENT_POLL_INTERVAL_SECS", default_value_t = 15)]
    poll_interval_secs: u64,

    /// Container reconcile interval, in seconds
    #[arg(long, env = "AGENT_DEPLOY_INTERVAL_SECS", default_value_t = 20)]
    deploy_interval_secs: u64,

    /// Directory holding per-service compose files
    #[arg(long, env = "AGENT_COMPOSE_DIR", default_value = "./compose")]
    compose_dir: PathBuf,

    /// Container engine CLI
    #[arg(long, env = "AGENT_DOCKER_BIN", default_value = "docker")]
    docker_bin: String,

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

    let _log_guard = match init_logging(cli.log.to_options("mdp-agent.log")) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AgentOptions {
        control_plane_url: cli.control_plane,
        proxy_config_path: cli.traefik_file,
        compose_dir: cli.compose_dir,
        docker_binary: cli.docker_bin,
        proxy_config_worker: proxy_config::Options {
            interval: Duration::from_secs(cli.poll_interval_secs.max(1)),
            ..Default::default()
        },
        reconcile_worker: reconcile::Options {
            interval: Duration::from_secs(cli.deploy_interval_secs.max(1)),
            ..Default::default()
        },
        ..Default::default()
    };

    info!("Running agent with options: {:?}", options);
    if let Err(e) = run_agent(options, await_shutdown_signal()).await {
        error!("Agent failed: {e}");
        std::process::exit(1);
    }
}
