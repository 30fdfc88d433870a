//! Provisioning, listing and removal of per-recipient service fleets on
//! Docker Swarm, behind a shared Traefik proxy on a shared overlay network.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod fleet;
pub mod identifier;
pub mod recipients;
pub mod runtime;
pub mod types;
