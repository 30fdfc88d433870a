use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::PortBinding;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Overlay network shared by the proxy and every fleet instance.
    pub network_name: String,
    pub proxy: ProxyConfig,
    pub workload: WorkloadConfig,
    pub fleet: FleetConfig,
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    pub service_name: String,
    pub volume_name: String,
    pub image: String,
    pub ports: Vec<PortBinding>,
    pub constraints: Vec<String>,
    pub log_level: String,
    /// Engine control socket, bind-mounted so the proxy can discover services.
    pub socket_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkloadConfig {
    pub image_tag: String,
    pub build_context: PathBuf,
    /// Container port the proxy forwards to.
    pub routing_port: u16,
    pub shm_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FleetConfig {
    /// Value of the `group` label marking a service as fleet-managed.
    pub group: String,
    pub dedupe_recipients: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    pub target: String,
    pub landing: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_name: "pigeonhive_overlay".into(),
            proxy: ProxyConfig {
                service_name: "traefik_proxy".into(),
                volume_name: "traefik_data".into(),
                image: "traefik:v1.7.34-alpine".into(),
                ports: [80, 443, 8080]
                    .into_iter()
                    .map(|port| PortBinding {
                        published: port,
                        target: port,
                    })
                    .collect(),
                constraints: vec![
                    "node.labels.pigeonhive_leader == true".into(),
                    "node.role==manager".into(),
                ],
                log_level: "DEBUG".into(),
                socket_path: "/var/run/docker.sock".into(),
            },
            workload: WorkloadConfig {
                image_tag: "pigeoncell".into(),
                build_context: PathBuf::from("./pigeoncell_container"),
                routing_port: 5800,
                shm_path: "/dev/shm".into(),
            },
            fleet: FleetConfig {
                group: "pigeoncell".into(),
                dedupe_recipients: false,
            },
            defaults: Defaults {
                target: "https://example.com/".into(),
                landing: "test.local".into(),
            },
        }
    }
}

impl Config {
    /// Defaults, then `pigeonhive.toml` / `pigeonhive.json`, then an explicit
    /// file if given, then `PIGEONHIVE_*` variables (`__` separates sections).
    pub fn load(extra_file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("pigeonhive.toml"))
            .merge(Json::file("pigeonhive.json"));
        if let Some(path) = extra_file {
            figment = figment.merge(Toml::file(path));
        }
        let config = figment
            .merge(Env::prefixed("PIGEONHIVE_").split("__"))
            .extract()
            .map_err(Box::new)?;
        Ok(config)
    }
}
