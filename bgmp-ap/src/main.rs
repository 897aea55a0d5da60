//! Audio Player (bgmp-ap) - Main entry point
//!
//! Background playback service. Listens for control messages from the
//! presentation process (bgmp-ui) and broadcasts playback state back.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bgmp_ap::config::Config;
use bgmp_ap::playback::{signal_channel, SimulatedBackend};
use bgmp_ap::ControllerService;
use bgmp_common::config::{self as common_config, ConfigSource};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for bgmp-ap
#[derive(Parser, Debug)]
#[command(name = "bgmp-ap")]
#[command(about = "Background playback service for BGMP")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "BGMP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on for control messages
    #[arg(long, env = "BGMP_CONTROLLER_ADDR")]
    listen: Option<SocketAddr>,

    /// Address of the presentation process
    #[arg(long, env = "BGMP_PRESENTATION_ADDR")]
    presentation: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = common_config::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;
    bgmp_common::logging::init(&loaded.config.logging);

    info!(
        "Starting BGMP Audio Player (bgmp-ap) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &loaded.source {
        ConfigSource::File(path) => info!("Configuration: {}", path.display()),
        ConfigSource::Defaults { searched } => warn!(
            "No configuration file found{}, using defaults",
            searched
                .as_ref()
                .map(|p| format!(" at {}", p.display()))
                .unwrap_or_default()
        ),
    }

    let mut config = Config::from_toml(&loaded.config);
    if let Some(addr) = args.listen {
        config.controller_addr = addr;
    }
    if let Some(addr) = args.presentation {
        config.presentation_addr = addr;
    }

    let (signal_tx, signal_rx) = signal_channel(config.service.command_queue_depth);
    let backend = SimulatedBackend::new(
        Duration::from_millis(config.service.backend.track_duration_ms),
        signal_tx,
    );

    let service = ControllerService::bind(&config, backend, signal_rx)
        .await
        .with_context(|| format!("Failed to listen on {}", config.controller_addr))?;

    service
        .run_until(shutdown_signal())
        .await
        .context("Controller error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
