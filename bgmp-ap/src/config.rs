//! bgmp-ap specific configuration

use std::net::SocketAddr;

use bgmp_common::config::{ServiceConfig, TomlConfig};

/// Controller process configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the controller listens on
    pub controller_addr: SocketAddr,
    /// Address state broadcasts are sent to
    pub presentation_addr: SocketAddr,
    pub service: ServiceConfig,
}

impl Config {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            controller_addr: toml.endpoints.controller,
            presentation_addr: toml.endpoints.presentation,
            service: toml.service.clone(),
        }
    }
}
