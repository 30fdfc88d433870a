//! pigeonhive entry point.

use clap::Parser;
use log::{debug, error};

use pigeonhive::cli::{self, Cli, Commands};
use pigeonhive::config::Config;
use pigeonhive::runtime::DockerGateway;

const NOT_A_MANAGER: &str = "This host is not a swarm node; please run on a swarm manager node";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    // The banner needs no cluster, so it is shown before the swarm check.
    let Some(command) = cli.command else {
        cli::print_banner();
        return Ok(());
    };

    let cfg = Config::load(cli.config_file.as_deref())?;
    debug!("Loaded configuration: {:?}", cfg);

    // One client for the whole invocation, released before exit.
    let gateway = match DockerGateway::connect() {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Failed to connect to Docker: {}", e.describe());
            println!("{NOT_A_MANAGER}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::ensure_swarm_manager(&gateway).await {
        error!("Precondition failed: {}", e.describe());
        println!("{NOT_A_MANAGER}");
        drop(gateway);
        std::process::exit(1);
    }

    let outcome = match command {
        Commands::Create(create) => create.run(&gateway, &cfg).await,
        Commands::Query(query) => query.run(&gateway, &cfg).await,
        Commands::Delete(delete) => delete.run(&gateway, &cfg).await,
    };

    drop(gateway);
    outcome
}
