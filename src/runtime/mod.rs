use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ServiceDefinition, ServiceFilter, ServiceSummary, SwarmStatus};

pub mod docker;
#[cfg(test)]
pub mod memory;

pub use docker::DockerGateway;

/// The subset of the cluster manager's API the orchestrator relies on.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Reports whether the host is part of an active swarm, and as a manager.
    async fn swarm_status(&self) -> Result<SwarmStatus>;

    /// Names of the networks matching `name`.
    async fn list_networks(&self, name: &str) -> Result<Vec<String>>;

    async fn create_network(&self, name: &str, driver: &str) -> Result<()>;

    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceSummary>>;

    async fn create_service(&self, definition: &ServiceDefinition) -> Result<()>;

    async fn remove_service(&self, name: &str) -> Result<()>;

    async fn create_volume(&self, name: &str, driver: &str) -> Result<()>;

    /// Builds `context` (a directory holding a Dockerfile) and tags the result.
    async fn build_image(&self, context: &Path, tag: &str) -> Result<()>;
}
