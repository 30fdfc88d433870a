//! Data structures passed between the orchestration layer and the
//! cluster gateway.
//!
//! Recipients and identifiers are newtypes so that an unchecked string can
//! never end up as a service name or a recipient label.  The remaining types
//! describe services the way the gateway needs them and nothing more: the
//! swarm itself is the system of record, so none of these are persisted.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::recipients::is_valid_address;

/// A recipient address that passed grammar validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Recipient(String);

impl Recipient {
    /// Validates `candidate` and wraps it; `None` if the grammar rejects it.
    pub fn parse(candidate: &str) -> Option<Self> {
        is_valid_address(candidate).then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The short name a fleet instance is deployed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the gateway reports about a listed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSummary {
    pub name: String,
    pub labels: HashMap<String, String>,
}

/// Result of deciding whether a listed service belongs to the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    FleetInstance {
        identifier: Identifier,
        recipient: Recipient,
    },
    Unmanaged,
}

/// Server-side filter for service listings.
///
/// `Name` follows the engine's loose matching, so callers wanting an exact
/// name must compare the returned names themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFilter {
    All,
    Name(String),
    Label { key: String, value: String },
}

impl ServiceFilter {
    pub fn label(key: impl Into<String>, value: impl Into<String>) -> Self {
        ServiceFilter::Label {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub published: u16,
    pub target: u16,
}

/// A host path bind-mounted into every task of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

/// Everything needed to create one replicated swarm service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub image: String,
    pub networks: Vec<String>,
    pub env: Vec<String>,
    pub args: Vec<String>,
    pub mounts: Vec<BindMount>,
    pub labels: HashMap<String, String>,
    pub constraints: Vec<String>,
    pub ports: Vec<PortBinding>,
}

/// Swarm membership of the host the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwarmStatus {
    pub active: bool,
    pub manager: bool,
}

/// Which instances a delete request targets.  Criteria are unioned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSelector {
    pub all: bool,
    pub identifiers: Vec<String>,
    pub recipients: Vec<String>,
}

impl DeleteSelector {
    pub fn is_empty(&self) -> bool {
        !self.all && self.identifiers.is_empty() && self.recipients.is_empty()
    }
}
