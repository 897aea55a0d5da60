//! Configuration loading
//!
//! Both processes read the same TOML bootstrap file. Every field has a
//! built-in default, so a missing file is not an error.
//!
//! File resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `BGMP_CONFIG` environment variable
//! 3. Per-user config file (`~/.config/bgmp/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! Explicitly named files (1 and 2) must exist; the per-user file is optional.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "BGMP_CONFIG";

/// Default controller (playback service) port
pub const DEFAULT_CONTROLLER_PORT: u16 = 3000;

/// Default presentation (UI) port
pub const DEFAULT_PRESENTATION_PORT: u16 = 3002;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub endpoints: EndpointsConfig,
    pub service: ServiceConfig,
    pub presentation: PresentationConfig,
    pub logging: LoggingConfig,
}

/// Listening addresses of the two processes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointsConfig {
    pub controller: SocketAddr,
    pub presentation: SocketAddr,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            controller: localhost(DEFAULT_CONTROLLER_PORT),
            presentation: localhost(DEFAULT_PRESENTATION_PORT),
        }
    }
}

/// Controller process settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Pause between unbinding the bus and releasing its socket on shutdown
    pub settle_delay_ms: u64,

    /// Stop after this many consecutive backend errors
    ///
    /// The playlist length is always an upper bound, so a playlist whose every
    /// track fails stops after one lap.
    pub max_consecutive_errors: Option<usize>,

    /// Depth of the command and backend signal queues
    pub command_queue_depth: usize,

    pub backend: BackendConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            max_consecutive_errors: None,
            command_queue_depth: 64,
            backend: BackendConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Media backend settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Length of one track for the simulated backend
    pub track_duration_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            track_duration_ms: 180_000,
        }
    }
}

/// Presentation process settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresentationConfig {
    /// How long to wait for an answer to a liveness query
    pub liveness_timeout_ms: u64,

    /// How long a freshly launched controller gets to start answering
    pub startup_timeout_ms: u64,

    /// Controller executable; defaults to `bgmp-ap` next to the running binary
    pub service_binary: Option<PathBuf>,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: 500,
            startup_timeout_ms: 5_000,
            service_binary: None,
        }
    }
}

impl PresentationConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file found; `searched` is the per-user path that was tried
    Defaults { searched: Option<PathBuf> },
}

/// Resolved configuration plus its origin, for startup logging
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl TomlConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.controller == self.endpoints.presentation
            && self.endpoints.controller.port() != 0
        {
            return Err(Error::Config(format!(
                "controller and presentation endpoints must differ (both {})",
                self.endpoints.controller
            )));
        }
        if self.service.settle_delay_ms > 10_000 {
            return Err(Error::Config(format!(
                "settle_delay_ms must be at most 10000, got {}",
                self.service.settle_delay_ms
            )));
        }
        if self.service.command_queue_depth == 0 {
            return Err(Error::Config("command_queue_depth must be positive".to_string()));
        }
        if self.service.max_consecutive_errors == Some(0) {
            return Err(Error::Config(
                "max_consecutive_errors must be positive when set".to_string(),
            ));
        }
        if self.service.backend.track_duration_ms == 0 {
            return Err(Error::Config("track_duration_ms must be positive".to_string()));
        }
        Ok(())
    }
}

/// Resolve the configuration file following the priority order above
pub fn resolve(cli_path: Option<&Path>) -> Result<LoadedConfig> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return load_from(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return load_from(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file
    let user_path = default_config_path();
    if let Some(path) = user_path.as_ref().filter(|p| p.exists()) {
        return load_from(path.clone());
    }

    // Priority 4: Compiled defaults
    Ok(LoadedConfig {
        config: TomlConfig::default(),
        source: ConfigSource::Defaults {
            searched: user_path,
        },
    })
}

fn load_from(path: PathBuf) -> Result<LoadedConfig> {
    let config = TomlConfig::load(&path)?;
    Ok(LoadedConfig {
        config,
        source: ConfigSource::File(path),
    })
}

/// Per-user config file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bgmp").join("config.toml"))
}

fn localhost(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.endpoints.controller.to_string(), "127.0.0.1:3000");
        assert_eq!(config.endpoints.presentation.to_string(), "127.0.0.1:3002");
        assert_eq!(config.service.settle_delay(), Duration::from_millis(100));
        assert_eq!(config.service.max_consecutive_errors, None);
        assert_eq!(config.presentation.liveness_timeout(), Duration::from_millis(500));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        assert_eq!(TomlConfig::from_toml_str("").unwrap(), TomlConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = TomlConfig::from_toml_str(
            r#"
            [endpoints]
            controller = "127.0.0.1:4000"

            [service]
            max_consecutive_errors = 3

            [service.backend]
            track_duration_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints.controller.port(), 4000);
        assert_eq!(config.endpoints.presentation.port(), DEFAULT_PRESENTATION_PORT);
        assert_eq!(config.service.max_consecutive_errors, Some(3));
        assert_eq!(config.service.settle_delay_ms, 100);
        assert_eq!(config.service.backend.track_duration_ms, 2500);
    }

    #[test]
    fn test_validation_failures() {
        for toml in [
            "[endpoints]\ncontroller = \"127.0.0.1:5000\"\npresentation = \"127.0.0.1:5000\"",
            "[service]\nsettle_delay_ms = 60000",
            "[service]\ncommand_queue_depth = 0",
            "[service]\nmax_consecutive_errors = 0",
            "[service.backend]\ntrack_duration_ms = 0",
            "[service]\nunknown_key = 1",
            "[endpoints]\ncontroller = \"not an address\"",
        ] {
            assert!(
                matches!(TomlConfig::from_toml_str(toml), Err(Error::Config(_))),
                "should reject: {}",
                toml
            );
        }
    }
}
