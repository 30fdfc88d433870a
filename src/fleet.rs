//! Creating, listing and removing per-recipient fleet instances.
//!
//! The swarm's label store is the only record of the fleet: an instance is
//! a service named by its identifier and carrying the group and recipient
//! labels.  Nothing is cached locally between calls.

use std::collections::{HashMap, HashSet};

use log::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identifier::IdentifierGenerator;
use crate::runtime::ClusterGateway;
use crate::types::{
    BindMount, Classification, DeleteSelector, Identifier, Recipient, ServiceDefinition,
    ServiceFilter, ServiceSummary,
};

pub const GROUP_LABEL: &str = "group";
pub const RECIPIENT_LABEL: &str = "email";
pub const ROUTING_PORT_LABEL: &str = "traefik.port";

/// A create that the engine refused.
#[derive(Debug)]
pub struct CreateFailure {
    pub identifier: Identifier,
    pub recipient: Recipient,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct CreateReport {
    pub created: Vec<(Identifier, Recipient)>,
    pub failures: Vec<CreateFailure>,
}

/// A removal that the engine refused.
#[derive(Debug)]
pub struct RemoveFailure {
    pub name: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub removed: Vec<String>,
    pub failures: Vec<RemoveFailure>,
}

/// Decides whether `service` is a fleet instance of `group`.
///
/// A service needs both the group label and a valid recipient label; a
/// group-tagged service without a usable recipient is left alone.
pub fn classify(service: &ServiceSummary, group: &str) -> Classification {
    if service.labels.get(GROUP_LABEL).map(String::as_str) != Some(group) {
        return Classification::Unmanaged;
    }
    match service
        .labels
        .get(RECIPIENT_LABEL)
        .and_then(|value| Recipient::parse(value))
    {
        Some(recipient) => Classification::FleetInstance {
            identifier: Identifier::new(service.name.clone()),
            recipient,
        },
        None => Classification::Unmanaged,
    }
}

pub struct FleetManager<'a, G: ?Sized> {
    gateway: &'a G,
    config: &'a Config,
}

impl<'a, G: ClusterGateway + ?Sized> FleetManager<'a, G> {
    pub fn new(gateway: &'a G, config: &'a Config) -> Self {
        Self { gateway, config }
    }

    /// Builds the workload image, then creates one instance per recipient.
    ///
    /// Build errors abort before anything is created.  A failed instance is
    /// recorded in the report and the remaining recipients are still tried.
    pub async fn create(
        &self,
        recipients: &[Recipient],
        target: &str,
        landing: &str,
    ) -> Result<CreateReport> {
        let workload = &self.config.workload;
        info!(
            "Building workload image with tag '{}' from {}",
            workload.image_tag,
            workload.build_context.display()
        );
        self.gateway
            .build_image(&workload.build_context, &workload.image_tag)
            .await?;

        // Names already in the cluster may belong to instances from earlier runs.
        let taken = self.gateway.list_services(&ServiceFilter::All).await?;
        let mut generator =
            IdentifierGenerator::new().with_reserved(taken.into_iter().map(|s| s.name));

        let assignments: Vec<(Identifier, Recipient)> = recipients
            .iter()
            .map(|recipient| (generator.next(), recipient.clone()))
            .collect();

        let mut report = CreateReport::default();
        for (identifier, recipient) in assignments {
            info!(
                "Creating service for {}: {} (host {}.{})",
                identifier, recipient, identifier, landing
            );
            let definition = self.instance_definition(&identifier, &recipient, target);
            match self.gateway.create_service(&definition).await {
                Ok(()) => report.created.push((identifier, recipient)),
                Err(e) => {
                    error!(
                        "Failed to create {} for {}: {}",
                        identifier,
                        recipient,
                        e.describe()
                    );
                    report.failures.push(CreateFailure {
                        identifier,
                        recipient,
                        error: e,
                    });
                }
            }
        }

        Ok(report)
    }

    fn instance_definition(
        &self,
        identifier: &Identifier,
        recipient: &Recipient,
        target: &str,
    ) -> ServiceDefinition {
        let workload = &self.config.workload;
        ServiceDefinition {
            name: identifier.to_string(),
            image: workload.image_tag.clone(),
            networks: vec![self.config.network_name.clone()],
            env: vec![format!("URL={target}")],
            mounts: vec![BindMount {
                source: workload.shm_path.clone(),
                target: workload.shm_path.clone(),
                read_only: false,
            }],
            labels: HashMap::from([
                (GROUP_LABEL.to_string(), self.config.fleet.group.clone()),
                (RECIPIENT_LABEL.to_string(), recipient.to_string()),
                (
                    ROUTING_PORT_LABEL.to_string(),
                    workload.routing_port.to_string(),
                ),
            ]),
            ..Default::default()
        }
    }

    /// All fleet instances currently in the cluster, as identifier/recipient pairs.
    pub async fn list(&self) -> Result<Vec<(Identifier, Recipient)>> {
        let group = &self.config.fleet.group;
        let services = self
            .gateway
            .list_services(&ServiceFilter::label(GROUP_LABEL, group.as_str()))
            .await?;

        Ok(services
            .iter()
            .filter_map(|service| match classify(service, group) {
                Classification::FleetInstance {
                    identifier,
                    recipient,
                } => Some((identifier, recipient)),
                Classification::Unmanaged => None,
            })
            .collect())
    }

    /// Removes every service matched by any criterion of `selector`, once.
    ///
    /// Lookup errors abort before anything is removed; removal errors are
    /// collected and the rest of the matches are still removed.
    pub async fn delete(&self, selector: &DeleteSelector) -> Result<DeleteReport> {
        let mut filters = Vec::new();
        if selector.all {
            filters.push((
                ServiceFilter::label(GROUP_LABEL, self.config.fleet.group.as_str()),
                None,
            ));
        }
        for id in &selector.identifiers {
            // The engine's name filter is loose; keep exact matches only.
            filters.push((ServiceFilter::Name(id.clone()), Some(id.as_str())));
        }
        for recipient in &selector.recipients {
            filters.push((ServiceFilter::label(RECIPIENT_LABEL, recipient.as_str()), None));
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for (filter, exact_name) in filters {
            for service in self.gateway.list_services(&filter).await? {
                if exact_name.is_some_and(|name| name != service.name) {
                    continue;
                }
                if seen.insert(service.name.clone()) {
                    targets.push(service.name);
                }
            }
        }

        let mut report = DeleteReport::default();
        for name in targets {
            info!("Removing {}", name);
            match self.gateway.remove_service(&name).await {
                Ok(()) => report.removed.push(name),
                Err(e) => {
                    error!("Failed to remove {}: {}", name, e.describe());
                    report.failures.push(RemoveFailure { name, error: e });
                }
            }
        }

        Ok(report)
    }
}
