//! Controller process supervision
//!
//! The presentation process starts the controller on demand and checks
//! whether one is running before it queries state.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Name of the controller binary
pub const SERVICE_BINARY_NAME: &str = "bgmp-ap";

/// Knows whether the controller runs, and how to launch it
pub trait ServiceSupervisor: Send + Sync {
    fn is_running(&self) -> bool;

    /// Launch the controller; it keeps running after this process exits
    fn start(&self) -> Result<()>;
}

/// Supervises a local `bgmp-ap` process
///
/// Launched controllers outlive this process. While it runs, their handles
/// are kept so that exited ones are reaped on the next probe.
#[derive(Debug)]
pub struct ProcessSupervisor {
    controller_addr: SocketAddr,
    presentation_addr: SocketAddr,
    binary: Option<PathBuf>,
    config_file: Option<PathBuf>,
    children: Mutex<Vec<Child>>,
}

impl ProcessSupervisor {
    pub fn new(config: &Config) -> Self {
        Self {
            controller_addr: config.controller_addr,
            presentation_addr: config.presentation_addr,
            binary: config.service_binary.clone(),
            config_file: config.config_file.clone(),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Collect launched controllers that have exited
    ///
    /// Returns how many are still running.
    pub fn reap(&self) -> usize {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), "Controller exited: {}", status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(pid = child.id(), "Cannot check controller status: {}", e);
                true
            }
        });
        children.len()
    }

    /// Controller binary: configured path, else next to the running
    /// executable, else looked up on `PATH`
    pub fn binary(&self) -> PathBuf {
        if let Some(binary) = &self.binary {
            return binary.clone();
        }
        let file_name = format!("{}{}", SERVICE_BINARY_NAME, std::env::consts::EXE_SUFFIX);
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
            .filter(|candidate| candidate.is_file())
            .unwrap_or_else(|| PathBuf::from(file_name))
    }
}

impl ServiceSupervisor for ProcessSupervisor {
    /// The controller holds its address for its whole life, so an address
    /// that cannot be bound means it is running
    fn is_running(&self) -> bool {
        self.reap();
        address_in_use(self.controller_addr)
    }

    fn start(&self) -> Result<()> {
        let binary = self.binary();
        let mut command = Command::new(&binary);
        command
            .arg("--listen")
            .arg(self.controller_addr.to_string())
            .arg("--presentation")
            .arg(self.presentation_addr.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(config_file) = &self.config_file {
            command.arg("--config").arg(config_file);
        }

        let child = command.spawn().map_err(|e| Error::Spawn {
            binary: binary.clone(),
            reason: e.to_string(),
        })?;
        info!(
            pid = child.id(),
            "Started controller {} on {}",
            binary.display(),
            self.controller_addr
        );
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(child);
        Ok(())
    }
}

/// Probe whether something already holds `addr`
pub fn address_in_use(addr: SocketAddr) -> bool {
    match UdpSocket::bind(addr) {
        Ok(_probe) => false,
        Err(e) if e.kind() == ErrorKind::AddrInUse => true,
        Err(e) => {
            debug!("Probe of {} failed: {}", addr, e);
            warn!("Cannot tell whether the controller is running at {}", addr);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config_for(controller_addr: SocketAddr) -> Config {
        Config {
            controller_addr,
            presentation_addr: "127.0.0.1:0".parse().unwrap(),
            liveness_timeout: Duration::from_millis(100),
            startup_timeout: Duration::from_millis(100),
            service_binary: None,
            config_file: None,
        }
    }

    #[test]
    fn test_is_running_when_address_held() {
        let holder = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = holder.local_addr().unwrap();
        let supervisor = ProcessSupervisor::new(&config_for(addr));

        assert!(supervisor.is_running());
        drop(holder);
        assert!(!supervisor.is_running());
    }

    #[test]
    fn test_configured_binary_wins() {
        let mut config = config_for("127.0.0.1:0".parse().unwrap());
        config.service_binary = Some(PathBuf::from("/opt/bgmp/bin/bgmp-ap"));
        let supervisor = ProcessSupervisor::new(&config);
        assert_eq!(supervisor.binary(), PathBuf::from("/opt/bgmp/bin/bgmp-ap"));
    }

    #[test]
    fn test_start_with_missing_binary_fails() {
        let mut config = config_for("127.0.0.1:0".parse().unwrap());
        config.service_binary = Some(PathBuf::from("/nonexistent/bgmp-ap"));
        let supervisor = ProcessSupervisor::new(&config);
        assert!(matches!(supervisor.start(), Err(Error::Spawn { .. })));
        assert_eq!(supervisor.reap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_controller_is_reaped_on_probe() {
        let mut config = config_for("127.0.0.1:0".parse().unwrap());
        // Accepts and ignores the controller arguments, then exits
        config.service_binary = Some(PathBuf::from("true"));
        let supervisor = ProcessSupervisor::new(&config);

        supervisor.start().unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while supervisor.reap() > 0 {
            assert!(std::time::Instant::now() < deadline, "child never reaped");
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(supervisor.children.lock().unwrap().is_empty());
    }
}
