//! bgmp-ui specific configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use bgmp_common::config::TomlConfig;

/// Presentation process configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address control messages are sent to
    pub controller_addr: SocketAddr,
    /// Address the presentation process listens on for broadcasts
    pub presentation_addr: SocketAddr,
    /// How long to wait for a `service_state` reply
    pub liveness_timeout: Duration,
    /// How long to wait for a launched controller to answer
    pub startup_timeout: Duration,
    /// Controller binary to launch; found next to this binary when unset
    pub service_binary: Option<PathBuf>,
    /// Configuration file handed to a launched controller
    pub config_file: Option<PathBuf>,
}

impl Config {
    pub fn from_toml(toml: &TomlConfig, config_file: Option<PathBuf>) -> Self {
        Self {
            controller_addr: toml.endpoints.controller,
            presentation_addr: toml.endpoints.presentation,
            liveness_timeout: toml.presentation.liveness_timeout(),
            startup_timeout: toml.presentation.startup_timeout(),
            service_binary: toml.presentation.service_binary.clone(),
            config_file,
        }
    }
}
