//! Build worker entry point

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;
use tracing::{error, info};

use mdp::app::options::BuildWorkerOptions;
use mdp::app::run::run_build_worker;
use mdp::build::DockerBuilderOptions;
use mdp::cli::{await_shutdown_signal, version_json, LogArgs};
use mdp::filesys::dir::Dir;
use mdp::logs::init_logging;
use mdp::workers::build;

/// Claims build jobs, builds images and deploys them
#[derive(Debug, Parser)]
#[command(name = "mdp-build-worker", disable_version_flag = true)]
struct Cli {
    /// Control plane base URL
    #[arg(long, env = "CONTROL_PLANE_URL", default_value = "http://localhost:8080")]
    control_plane: String,

    /// Worker identifier reported on claims
    #[arg(long, env = "BUILD_WORKER_NAME", default_value = "builder-local")]
    name: String,

    /// Polling interval, in seconds
    #[arg(long, env = "BUILD_WORKER_INTERVAL_SECS", default_value_t = 5)]
    interval_secs: u64,

    /// Workspace for checkouts
    #[arg(long, env = "BUILD_WORKER_WORKSPACE", default_value = "./worker-tmp")]
    workspace: PathBuf,

    /// Registry prefix such as ghcr.io/org
    #[arg(long, env = "BUILD_WORKER_REGISTRY", default_value = "")]
    registry: String,

    /// Push built images
    #[arg(long)]
    push: bool,

    /// Keep checkouts after builds
    #[arg(long)]
    keep_workspace: bool,

    /// Token for cloning private repositories
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

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

    let _log_guard = match init_logging(cli.log.to_options("mdp-build-worker.log")) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = BuildWorkerOptions {
        control_plane_url: cli.control_plane,
        builder: DockerBuilderOptions {
            workspace: Dir::new(cli.workspace),
            registry_prefix: cli.registry,
            push: cli.push,
            keep_workspace: cli.keep_workspace,
            github_token: cli
                .github_token
                .filter(|token| !token.is_empty())
                .map(SecretString::from),
        },
        worker: build::Options {
            worker_name: cli.name,
            interval: Duration::from_secs(cli.interval_secs.max(1)),
            ..Default::default()
        },
        ..Default::default()
    };

    info!("Running build worker with options: {:?}", options);
    if let Err(e) = run_build_worker(options, await_shutdown_signal()).await {
        error!("Build worker failed: {e}");
        std::process::exit(1);
    }
}
