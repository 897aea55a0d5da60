//! User Interface (bgmp-ui) - Main entry point
//!
//! Command-line front end. Each invocation binds the presentation address,
//! talks to the background player (starting it when tracks are added) and
//! prints what the player reports.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bgmp_common::config::{self as common_config, ConfigSource};
use bgmp_common::StateBroadcast;
use bgmp_ui::config::Config;
use bgmp_ui::interactive::{self, Input};
use bgmp_ui::metadata::FileNameMetadata;
use bgmp_ui::picker;
use bgmp_ui::supervisor::ProcessSupervisor;
use bgmp_ui::{PresentationProxy, UiCommand};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Command-line arguments for bgmp-ui
#[derive(Parser, Debug)]
#[command(name = "bgmp-ui")]
#[command(about = "Front end for the BGMP background music player")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "BGMP_CONFIG")]
    config: Option<PathBuf>,

    /// Address of the background player
    #[arg(long, env = "BGMP_CONTROLLER_ADDR")]
    controller: Option<SocketAddr>,

    /// Address to listen on for player state
    #[arg(long, env = "BGMP_PRESENTATION_ADDR")]
    listen: Option<SocketAddr>,

    /// Terminal width used for wrapping
    #[arg(long, env = "COLUMNS", default_value_t = 80)]
    columns: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add files or directories to the playlist, starting the player if needed
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Skip to the next track
    Next,
    /// Skip to the previous track
    Previous,
    /// Stop the player and clear the playlist
    Stop,
    /// Show the player state
    Status,
    /// Print the player state whenever it changes, until Ctrl+C
    Watch,
    /// Read commands from stdin
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = common_config::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;
    bgmp_common::logging::init(&loaded.config.logging);

    info!(
        "Starting BGMP User Interface (bgmp-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    let config_file = match &loaded.source {
        ConfigSource::File(path) => {
            debug!("Configuration: {}", path.display());
            Some(path.clone())
        }
        ConfigSource::Defaults { .. } => {
            debug!("No configuration file found, using defaults");
            None
        }
    };

    let mut config = Config::from_toml(&loaded.config, config_file);
    if let Some(addr) = args.controller {
        config.controller_addr = addr;
    }
    if let Some(addr) = args.listen {
        config.presentation_addr = addr;
    }

    let supervisor = Arc::new(ProcessSupervisor::new(&config));
    let proxy = PresentationProxy::bind(&config, supervisor, Arc::new(FileNameMetadata))
        .await
        .with_context(|| {
            format!(
                "Failed to listen on {} (is another bgmp-ui running?)",
                config.presentation_addr
            )
        })?;
    // A terminal user is always allowed to drive the player
    proxy.grant_permission();

    let outcome = run(&proxy, args.command, args.columns).await;
    proxy.close().await;
    outcome
}

async fn run(proxy: &PresentationProxy, command: Command, columns: usize) -> Result<()> {
    match command {
        Command::Add { paths } => add(proxy, &paths).await?,
        Command::Play => play_or_pause(proxy, false).await?,
        Command::Pause => play_or_pause(proxy, true).await?,
        Command::Next => proxy.handle(UiCommand::SkipNext).await?,
        Command::Previous => proxy.handle(UiCommand::SkipPrevious).await?,
        Command::Stop => proxy.handle(UiCommand::Terminate).await?,
        Command::Status => status(proxy, columns).await,
        Command::Watch => watch(proxy, columns).await,
        Command::Interactive => run_interactive(proxy, columns).await?,
    }
    Ok(())
}

async fn add(proxy: &PresentationProxy, paths: &[PathBuf]) -> Result<()> {
    let tracks = picker::collect_tracks(paths).context("Failed to pick tracks")?;
    if tracks.is_empty() {
        warn!("No audio files found");
    }
    proxy
        .handle(UiCommand::AddToPlaylist(tracks))
        .await
        .context("Failed to add tracks")?;
    Ok(())
}

/// Send `pause` when `pause` is set, otherwise `play`
async fn play_or_pause(proxy: &PresentationProxy, pause: bool) -> Result<()> {
    proxy.set_show_pause(pause);
    proxy.handle(UiCommand::PlayPause).await?;
    Ok(())
}

async fn status(proxy: &PresentationProxy, columns: usize) {
    if !proxy.await_service_state().await {
        println!("The player is not running.");
    }
    println!("{}", proxy.display().render(columns));
}

async fn watch(proxy: &PresentationProxy, columns: usize) {
    let mut events = proxy.events();
    proxy.query_service_state();
    println!("{}\n", proxy.display().render(columns));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(StateBroadcast::PlaylistState(_)) => {
                    println!("{}\n", proxy.display().render(columns));
                }
                Ok(StateBroadcast::TrackState(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Skipped {} broadcasts", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

async fn run_interactive(proxy: &PresentationProxy, columns: usize) -> Result<()> {
    let mut events = proxy.events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    proxy.query_service_state();
    println!("{}", interactive::HELP);
    println!("{}", proxy.display().render(columns));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let input = match interactive::parse_line(&line) {
                    None => continue,
                    Some(Ok(input)) => input,
                    Some(Err(message)) => {
                        println!("{}", message);
                        continue;
                    }
                };
                if input == Input::Quit {
                    break;
                }
                if let Err(e) = apply_input(proxy, input, columns).await {
                    println!("{:#}", e);
                }
            }
            event = events.recv() => match event {
                Ok(StateBroadcast::PlaylistState(_)) => {
                    println!("{}", proxy.display().render(columns));
                }
                Ok(StateBroadcast::TrackState(_)) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

async fn apply_input(proxy: &PresentationProxy, input: Input, columns: usize) -> Result<()> {
    match input {
        Input::Add(paths) => add(proxy, &paths).await?,
        Input::Play => play_or_pause(proxy, false).await?,
        Input::Pause => play_or_pause(proxy, true).await?,
        Input::Toggle => proxy.handle(UiCommand::PlayPause).await?,
        Input::Next => proxy.handle(UiCommand::SkipNext).await?,
        Input::Previous => proxy.handle(UiCommand::SkipPrevious).await?,
        Input::Stop => proxy.handle(UiCommand::Terminate).await?,
        Input::Status => {
            if !proxy.query_service_state() {
                println!("The player is not running.");
                println!("{}", proxy.display().render(columns));
            }
        }
        Input::Help => println!("{}", interactive::HELP),
        Input::Quit => {}
    }
    Ok(())
}
