//! Shared infrastructure every fleet instance depends on: the overlay
//! network, and the reverse proxy together with its data volume.
//!
//! Both steps are check-then-create and safe to run on every invocation.

use std::collections::HashMap;

use log::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::runtime::ClusterGateway;
use crate::types::{BindMount, ServiceDefinition, ServiceFilter};

const NETWORK_DRIVER: &str = "overlay";
const VOLUME_DRIVER: &str = "local";

/// What an `ensure_*` call had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyPresent,
}

pub struct Bootstrapper<'a, G: ?Sized> {
    gateway: &'a G,
    config: &'a Config,
}

impl<'a, G: ClusterGateway + ?Sized> Bootstrapper<'a, G> {
    pub fn new(gateway: &'a G, config: &'a Config) -> Self {
        Self { gateway, config }
    }

    pub async fn ensure_network(&self) -> Result<Provisioned> {
        let name = &self.config.network_name;
        let resource = format!("overlay network '{name}'");

        let existing = self
            .gateway
            .list_networks(name)
            .await
            .map_err(|e| Error::bootstrap(&resource, e))?;
        if existing.iter().any(|n| n == name) {
            info!("Overlay network '{}' already present", name);
            return Ok(Provisioned::AlreadyPresent);
        }

        info!("No overlay network detected, creating '{}'", name);
        match self.gateway.create_network(name, NETWORK_DRIVER).await {
            Ok(()) => {
                info!("Created overlay network '{}'", name);
                Ok(Provisioned::Created)
            }
            // Another invocation won the race.
            Err(e) if e.is_conflict() => {
                debug!("Network '{}' appeared concurrently: {}", name, e.describe());
                Ok(Provisioned::AlreadyPresent)
            }
            Err(e) => Err(Error::bootstrap(resource, e)),
        }
    }

    /// Makes sure the proxy service exists, serving `landing` as its domain.
    pub async fn ensure_proxy(&self, landing: &str) -> Result<Provisioned> {
        let proxy = &self.config.proxy;
        let resource = format!("proxy service '{}'", proxy.service_name);

        let existing = self
            .gateway
            .list_services(&ServiceFilter::Name(proxy.service_name.clone()))
            .await
            .map_err(|e| Error::bootstrap(&resource, e))?;
        if existing.iter().any(|s| s.name == proxy.service_name) {
            info!("Proxy service '{}' already present", proxy.service_name);
            return Ok(Provisioned::AlreadyPresent);
        }

        info!("Creating proxy service '{}'", proxy.service_name);
        match self
            .gateway
            .create_volume(&proxy.volume_name, VOLUME_DRIVER)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                debug!("Volume '{}' already exists", proxy.volume_name);
            }
            Err(e) => {
                return Err(Error::bootstrap(
                    format!("proxy volume '{}'", proxy.volume_name),
                    e,
                ))
            }
        }

        self.gateway
            .create_service(&self.proxy_definition(landing))
            .await
            .map_err(|e| Error::bootstrap(resource, e))?;
        info!("Created proxy service '{}'", proxy.service_name);
        Ok(Provisioned::Created)
    }

    fn proxy_definition(&self, landing: &str) -> ServiceDefinition {
        let proxy = &self.config.proxy;
        ServiceDefinition {
            name: proxy.service_name.clone(),
            image: proxy.image.clone(),
            networks: vec![self.config.network_name.clone()],
            args: vec![
                "--docker".into(),
                "--docker.swarmmode".into(),
                format!("--docker.domain={landing}"),
                "--docker.watch".into(),
                format!("--logLevel={}", proxy.log_level),
                "--web".into(),
            ],
            mounts: vec![BindMount {
                source: proxy.socket_path.clone(),
                target: proxy.socket_path.clone(),
                read_only: false,
            }],
            constraints: proxy.constraints.clone(),
            ports: proxy.ports.clone(),
            labels: HashMap::new(),
            env: Vec::new(),
        }
    }
}
