//! Operator-facing command surface.
//!
//! ```bash
//! # one instance per address, read from literals and files
//! pigeonhive create alice@example.com recipients.txt --landing hive.example.net
//!
//! pigeonhive query list
//!
//! pigeonhive delete --id k3x9q2ab --email alice@example.com
//! pigeonhive delete --all
//! ```

use std::path::PathBuf;

use anyhow::bail;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::info;

use crate::bootstrap::Bootstrapper;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fleet::FleetManager;
use crate::recipients;
use crate::runtime::ClusterGateway;
use crate::types::DeleteSelector;

#[derive(Parser)]
#[command(
    name = "pigeonhive",
    version,
    about = "Management console for per-recipient service fleets on Docker Swarm"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Extra TOML configuration file, merged over pigeonhive.toml.
    #[arg(
        long = "config",
        short = 'c',
        env = "PIGEONHIVE_CONFIG_FILE",
        global = true
    )]
    pub config_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create one service per recipient.
    Create(CreateCommand),

    /// Query running fleet services.
    Query(QueryCommand),

    /// Delete fleet services.
    Delete(DeleteCommand),
}

#[derive(Args)]
pub struct CreateCommand {
    /// Email address(es), or file(s) holding one address per line.
    #[arg(required = true, num_args = 1..)]
    pub recipients: Vec<String>,

    /// URL handed to every instance as its target.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Host name the proxy serves the fleet under.
    #[arg(short, long)]
    pub landing: Option<String>,
}

#[derive(Args)]
pub struct QueryCommand {
    #[arg(value_enum)]
    pub action: QueryAction,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum QueryAction {
    /// List fleet services as `<id>: <email>`.
    List,
}

#[derive(Args)]
pub struct DeleteCommand {
    /// Email address(es) whose services should be removed.
    #[arg(short = 'e', long = "email", action = ArgAction::Append, num_args = 1..)]
    pub emails: Vec<String>,

    /// Generated 8-character ID(s) to remove (the service name).
    #[arg(short = 'i', long = "id", action = ArgAction::Append, num_args = 1..)]
    pub ids: Vec<String>,

    /// Remove every fleet service.
    #[arg(short, long)]
    pub all: bool,
}

/// Fails unless the engine is an active swarm member with manager rights.
pub async fn ensure_swarm_manager<G: ClusterGateway + ?Sized>(gateway: &G) -> Result<()> {
    let status = gateway.swarm_status().await?;
    if !status.active {
        return Err(Error::NotSwarmManager {
            reason: "swarm mode is not active".into(),
        });
    }
    if !status.manager {
        return Err(Error::NotSwarmManager {
            reason: "node is a worker".into(),
        });
    }
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   pigeonhive
   ----------
   per-recipient service fleets on Docker Swarm
"#
    );
    println!("Pass -h or --help for usage");
}

impl CreateCommand {
    pub async fn run<G: ClusterGateway + ?Sized>(
        self,
        gateway: &G,
        config: &Config,
    ) -> anyhow::Result<()> {
        let mut resolution = recipients::resolve(&self.recipients);
        for diagnostic in &resolution.diagnostics {
            println!("{diagnostic}");
        }
        if config.fleet.dedupe_recipients {
            resolution = resolution.deduplicated();
        }
        if resolution.recipients.is_empty() {
            bail!("no valid recipients given, nothing to create");
        }

        let target = self.target.as_deref().unwrap_or(&config.defaults.target);
        let landing = self.landing.as_deref().unwrap_or(&config.defaults.landing);

        let bootstrapper = Bootstrapper::new(gateway, config);
        bootstrapper.ensure_network().await?;
        bootstrapper.ensure_proxy(landing).await?;

        let report = FleetManager::new(gateway, config)
            .create(&resolution.recipients, target, landing)
            .await?;
        for (identifier, recipient) in &report.created {
            println!("{identifier}: {recipient}");
        }
        info!("Created {} service(s)", report.created.len());

        if !report.failures.is_empty() {
            for failure in &report.failures {
                println!(
                    "Failed to create {} for {}: {}",
                    failure.identifier,
                    failure.recipient,
                    failure.error.describe()
                );
            }
            bail!(
                "{} of {} service(s) could not be created",
                report.failures.len(),
                report.failures.len() + report.created.len()
            );
        }
        Ok(())
    }
}

impl QueryCommand {
    pub async fn run<G: ClusterGateway + ?Sized>(
        self,
        gateway: &G,
        config: &Config,
    ) -> anyhow::Result<()> {
        match self.action {
            QueryAction::List => {
                for (identifier, recipient) in FleetManager::new(gateway, config).list().await? {
                    println!("{identifier}: {recipient}");
                }
            }
        }
        Ok(())
    }
}

impl DeleteCommand {
    pub fn selector(&self) -> DeleteSelector {
        DeleteSelector {
            all: self.all,
            identifiers: self.ids.clone(),
            recipients: self.emails.clone(),
        }
    }

    pub async fn run<G: ClusterGateway + ?Sized>(
        self,
        gateway: &G,
        config: &Config,
    ) -> anyhow::Result<()> {
        let selector = self.selector();
        if selector.is_empty() {
            info!("No deletion criteria given");
            return Ok(());
        }

        let report = FleetManager::new(gateway, config).delete(&selector).await?;
        for name in &report.removed {
            println!("Removing {name}");
        }

        if !report.failures.is_empty() {
            for failure in &report.failures {
                println!("Failed to remove {}: {}", failure.name, failure.error.describe());
            }
            bail!("{} service(s) could not be removed", report.failures.len());
        }
        Ok(())
    }
}
