//! In-process stand-in for the swarm, used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ClusterGateway;
use crate::error::{Error, Result};
use crate::types::{ServiceDefinition, ServiceFilter, ServiceSummary, SwarmStatus};

#[derive(Default)]
struct State {
    networks: HashMap<String, String>,
    volumes: HashMap<String, String>,
    services: Vec<ServiceDefinition>,
    images: HashMap<String, PathBuf>,
    fail_create_for: HashSet<String>,
    fail_remove_for: HashSet<String>,
    fail_build: Option<String>,
}

pub struct InMemoryGateway {
    status: SwarmStatus,
    state: RwLock<State>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    /// A gateway that behaves like an active swarm manager.
    pub fn new() -> Self {
        Self::with_status(SwarmStatus {
            active: true,
            manager: true,
        })
    }

    pub fn with_status(status: SwarmStatus) -> Self {
        Self {
            status,
            state: RwLock::new(State::default()),
        }
    }

    pub async fn network_count(&self) -> usize {
        self.state.read().await.networks.len()
    }

    pub async fn network_driver(&self, name: &str) -> Option<String> {
        self.state.read().await.networks.get(name).cloned()
    }

    pub async fn volume_count(&self) -> usize {
        self.state.read().await.volumes.len()
    }

    pub async fn service(&self, name: &str) -> Option<ServiceDefinition> {
        let state = self.state.read().await;
        state.services.iter().find(|s| s.name == name).cloned()
    }

    pub async fn service_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.services.iter().map(|s| s.name.clone()).collect()
    }

    pub async fn has_image(&self, tag: &str) -> bool {
        self.state.read().await.images.contains_key(tag)
    }

    /// Inserts a service as if another run had created it.
    pub async fn seed_service(&self, definition: ServiceDefinition) {
        self.state.write().await.services.push(definition);
    }

    pub async fn seed_network(&self, name: &str, driver: &str) {
        let mut state = self.state.write().await;
        state.networks.insert(name.to_string(), driver.to_string());
    }

    /// Makes `create_service` fail for services with this name or label value.
    pub async fn fail_create_for(&self, value: &str) {
        self.state.write().await.fail_create_for.insert(value.to_string());
    }

    pub async fn fail_remove_for(&self, name: &str) {
        self.state.write().await.fail_remove_for.insert(name.to_string());
    }

    pub async fn fail_build(&self, message: &str) {
        self.state.write().await.fail_build = Some(message.to_string());
    }
}

// Errors are shaped like the engine's HTTP responses.
fn engine_error(status_code: u16, message: String) -> Error {
    Error::Docker(bollard::errors::Error::DockerResponseServerError {
        status_code,
        message,
    })
}

fn denied(name: &str) -> Error {
    engine_error(403, format!("permission denied for {name}"))
}

#[async_trait]
impl ClusterGateway for InMemoryGateway {
    async fn swarm_status(&self) -> Result<SwarmStatus> {
        Ok(self.status)
    }

    // Substring matching, like the engine's name filter.
    async fn list_networks(&self, name: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .networks
            .keys()
            .filter(|n| n.contains(name))
            .cloned()
            .collect())
    }

    async fn create_network(&self, name: &str, driver: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.networks.contains_key(name) {
            return Err(engine_error(409, format!("network with name {name} already exists")));
        }
        state.networks.insert(name.to_string(), driver.to_string());
        Ok(())
    }

    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceSummary>> {
        let state = self.state.read().await;
        Ok(state
            .services
            .iter()
            .filter(|s| match filter {
                ServiceFilter::All => true,
                ServiceFilter::Name(name) => s.name.starts_with(name.as_str()),
                ServiceFilter::Label { key, value } => s.labels.get(key) == Some(value),
            })
            .map(|s| ServiceSummary {
                name: s.name.clone(),
                labels: s.labels.clone(),
            })
            .collect())
    }

    async fn create_service(&self, definition: &ServiceDefinition) -> Result<()> {
        let mut state = self.state.write().await;
        if state.create_fails(definition) {
            return Err(denied(&definition.name));
        }
        if state.services.iter().any(|s| s.name == definition.name) {
            return Err(engine_error(
                409,
                format!("service {} already exists", definition.name),
            ));
        }
        state.services.push(definition.clone());
        Ok(())
    }

    async fn remove_service(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_remove_for.contains(name) {
            return Err(denied(name));
        }
        let before = state.services.len();
        state.services.retain(|s| s.name != name);
        if state.services.len() == before {
            return Err(engine_error(404, format!("service {name} not found")));
        }
        Ok(())
    }

    async fn create_volume(&self, name: &str, driver: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.volumes.insert(name.to_string(), driver.to_string());
        Ok(())
    }

    async fn build_image(&self, context: &Path, tag: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(message) = state.fail_build.clone() {
            return Err(Error::ImageBuild {
                tag: tag.to_string(),
                message,
            });
        }
        state.images.insert(tag.to_string(), context.to_path_buf());
        Ok(())
    }
}

impl State {
    fn create_fails(&self, definition: &ServiceDefinition) -> bool {
        self.fail_create_for.contains(&definition.name)
            || definition
                .labels
                .values()
                .any(|v| self.fail_create_for.contains(v))
    }
}
