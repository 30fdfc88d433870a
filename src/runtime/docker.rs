use std::collections::HashMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use bollard::image::BuildImageOptions;
use bollard::models::{
    EndpointPortConfig, EndpointPortConfigProtocolEnum, EndpointPortConfigPublishModeEnum,
    EndpointSpec, LocalNodeState, Mount, MountTypeEnum, NetworkAttachmentConfig, ServiceSpec,
    TaskSpec, TaskSpecContainerSpec, TaskSpecPlacement,
};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::service::ListServicesOptions;
use bollard::volume::CreateVolumeOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use log::{debug, info};

use super::ClusterGateway;
use crate::error::{Error, Result};
use crate::types::{ServiceDefinition, ServiceFilter, ServiceSummary, SwarmStatus};

/// [`ClusterGateway`] backed by the local Docker engine.
pub struct DockerGateway {
    docker: Docker,
}

impl DockerGateway {
    /// Connects using the local defaults (the unix socket on Linux, or
    /// whatever `DOCKER_HOST` points at).
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ClusterGateway for DockerGateway {
    async fn swarm_status(&self) -> Result<SwarmStatus> {
        let info = self.docker.info().await?;
        let status = match info.swarm {
            Some(swarm) => SwarmStatus {
                active: swarm.local_node_state == Some(LocalNodeState::ACTIVE),
                manager: swarm.control_available.unwrap_or(false),
            },
            None => SwarmStatus::default(),
        };
        debug!("Swarm status: {:?}", status);
        Ok(status)
    }

    async fn list_networks(&self, name: &str) -> Result<Vec<String>> {
        let opts = ListNetworksOptions {
            filters: HashMap::from([("name", vec![name])]),
        };
        let networks = self.docker.list_networks(Some(opts)).await?;
        Ok(networks.into_iter().filter_map(|n| n.name).collect())
    }

    async fn create_network(&self, name: &str, driver: &str) -> Result<()> {
        let opts = CreateNetworkOptions {
            name,
            driver,
            ..Default::default()
        };
        let response = self.docker.create_network(opts).await?;
        debug!("Network {} created with id {:?}", name, response.id);
        Ok(())
    }

    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceSummary>> {
        let filters = match filter {
            ServiceFilter::All => HashMap::new(),
            ServiceFilter::Name(name) => HashMap::from([("name".to_string(), vec![name.clone()])]),
            ServiceFilter::Label { key, value } => {
                HashMap::from([("label".to_string(), vec![format!("{key}={value}")])])
            }
        };
        let opts = ListServicesOptions::<String> {
            filters,
            ..Default::default()
        };
        let services = self.docker.list_services(Some(opts)).await?;

        Ok(services
            .into_iter()
            .filter_map(|service| {
                let spec = service.spec?;
                Some(ServiceSummary {
                    name: spec.name?,
                    labels: spec.labels.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn create_service(&self, definition: &ServiceDefinition) -> Result<()> {
        let response = self
            .docker
            .create_service(service_spec(definition), None)
            .await?;
        debug!(
            "Service {} created with id {:?}",
            definition.name, response.id
        );
        Ok(())
    }

    async fn remove_service(&self, name: &str) -> Result<()> {
        self.docker.delete_service(name).await?;
        Ok(())
    }

    async fn create_volume(&self, name: &str, driver: &str) -> Result<()> {
        let opts = CreateVolumeOptions {
            name,
            driver,
            ..Default::default()
        };
        let volume = self.docker.create_volume(opts).await?;
        debug!("Volume {} created", volume.name);
        Ok(())
    }

    async fn build_image(&self, context: &Path, tag: &str) -> Result<()> {
        let context_path = context.to_path_buf();
        let archive = tokio::task::spawn_blocking(move || pack_context(&context_path))
            .await
            .map_err(|e| Error::BuildContext {
                path: context.to_path_buf(),
                source: io::Error::other(e),
            })?
            .map_err(|source| Error::BuildContext {
                path: context.to_path_buf(),
                source,
            })?;

        let opts = BuildImageOptions {
            dockerfile: "Dockerfile",
            t: tag,
            rm: true,
            ..Default::default()
        };
        let mut stream = std::pin::pin!(self.docker.build_image(opts, None, Some(archive.into())));

        while let Some(step) = stream.next().await {
            let step = step?;
            if let Some(message) = step.error {
                return Err(Error::ImageBuild {
                    tag: tag.to_string(),
                    message: message.trim().to_string(),
                });
            }
            if let Some(output) = step.stream {
                let output = output.trim();
                if !output.is_empty() {
                    debug!("[build {}] {}", tag, output);
                }
            }
        }

        info!("Built image {}", tag);
        Ok(())
    }
}

/// Tars up a build context directory the way the engine expects it.
fn pack_context(context: &Path) -> io::Result<Vec<u8>> {
    if !context.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "build context is not a directory",
        ));
    }
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", context)?;
    builder.into_inner()
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    (!items.is_empty()).then(|| items.to_vec())
}

fn service_spec(definition: &ServiceDefinition) -> ServiceSpec {
    let mounts = definition
        .mounts
        .iter()
        .map(|m| Mount {
            source: Some(m.source.clone()),
            target: Some(m.target.clone()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(m.read_only),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let networks = definition
        .networks
        .iter()
        .map(|n| NetworkAttachmentConfig {
            target: Some(n.clone()),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let ports = definition
        .ports
        .iter()
        .map(|p| EndpointPortConfig {
            protocol: Some(EndpointPortConfigProtocolEnum::TCP),
            published_port: Some(i64::from(p.published)),
            target_port: Some(i64::from(p.target)),
            publish_mode: Some(EndpointPortConfigPublishModeEnum::INGRESS),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    ServiceSpec {
        name: Some(definition.name.clone()),
        labels: Some(definition.labels.clone()),
        task_template: Some(TaskSpec {
            container_spec: Some(TaskSpecContainerSpec {
                image: Some(definition.image.clone()),
                args: non_empty(&definition.args),
                env: non_empty(&definition.env),
                mounts: non_empty(&mounts),
                ..Default::default()
            }),
            placement: non_empty(&definition.constraints).map(|constraints| TaskSpecPlacement {
                constraints: Some(constraints),
                ..Default::default()
            }),
            networks: non_empty(&networks),
            ..Default::default()
        }),
        endpoint_spec: non_empty(&ports).map(|ports| EndpointSpec {
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}
