//! Presentation-side proxy
//!
//! Turns user intents into control messages for the controller and folds
//! the controller's state broadcasts into a [`DisplayState`]. The display is
//! published on a `watch` channel; raw broadcasts are also re-published on a
//! `broadcast` channel for callers waiting on a reply.
//!
//! Nothing is sent until permission has been granted.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bgmp_common::{ControlCommand, MessageBus, StateBroadcast, Topic, TrackRef};
use tokio::sync::{broadcast, watch};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::display::DisplayState;
use crate::error::Result;
use crate::metadata::MetadataProvider;
use crate::supervisor::ServiceSupervisor;

const EVENT_CAPACITY: usize = 16;

/// Per-attempt wait while a launched controller comes up
const STARTUP_POLL: Duration = Duration::from_millis(100);

/// User intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    AddToPlaylist(Vec<TrackRef>),
    Terminate,
    PlayPause,
    SkipNext,
    SkipPrevious,
}

pub struct PresentationProxy {
    bus: MessageBus,
    controller_addr: SocketAddr,
    supervisor: Arc<dyn ServiceSupervisor>,
    display: Arc<watch::Sender<DisplayState>>,
    events: broadcast::Sender<StateBroadcast>,
    has_permission: AtomicBool,
    liveness_timeout: Duration,
    startup_timeout: Duration,
}

impl PresentationProxy {
    /// Listen for broadcasts on the presentation address
    pub async fn bind(
        config: &Config,
        supervisor: Arc<dyn ServiceSupervisor>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Result<Self> {
        let bus = MessageBus::new("presentation")?;
        bus.listen(config.presentation_addr).await?;

        let (display, _) = watch::channel(DisplayState::default());
        let display = Arc::new(display);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        for topic in Topic::BROADCAST {
            let display = Arc::clone(&display);
            let events = events.clone();
            let metadata = Arc::clone(&metadata);
            bus.bind(topic.as_str(), move |message| {
                let update = match StateBroadcast::from_message(&message) {
                    Ok(update) => update,
                    Err(e) => {
                        warn!("Dropping malformed /{}: {}", message.topic, e);
                        return;
                    }
                };
                apply(&display, metadata.as_ref(), &update);
                // No subscribers is the normal case
                let _ = events.send(update);
            });
        }

        Ok(Self {
            bus,
            controller_addr: config.controller_addr,
            supervisor,
            display,
            events,
            has_permission: AtomicBool::new(false),
            liveness_timeout: config.liveness_timeout,
            startup_timeout: config.startup_timeout,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bus.local_addr()
    }

    pub fn grant_permission(&self) {
        self.has_permission.store(true, Ordering::SeqCst);
        debug!("Permission granted");
    }

    pub fn has_permission(&self) -> bool {
        self.has_permission.load(Ordering::SeqCst)
    }

    /// Current display
    pub fn display(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    /// Receive every display change
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    /// Receive raw state broadcasts
    pub fn events(&self) -> broadcast::Receiver<StateBroadcast> {
        self.events.subscribe()
    }

    /// Apply a user intent
    ///
    /// Only launching the controller can fail; send failures are logged.
    pub async fn handle(&self, command: UiCommand) -> Result<()> {
        if !self.has_permission() {
            debug!("No permission, ignoring {:?}", command);
            return Ok(());
        }

        match command {
            UiCommand::AddToPlaylist(tracks) => {
                self.ensure_running().await?;
                if tracks.is_empty() {
                    debug!("Nothing picked");
                } else {
                    info!("Adding {} tracks", tracks.len());
                    self.send(ControlCommand::AddPlaylist(tracks));
                }
            }
            UiCommand::Terminate => {
                self.send(ControlCommand::Terminate);
                self.set_show_pause(false);
            }
            UiCommand::PlayPause => {
                if self.display.borrow().show_pause {
                    self.send(ControlCommand::Pause);
                    self.set_show_pause(false);
                } else {
                    self.send(ControlCommand::Play);
                    self.set_show_pause(true);
                }
            }
            UiCommand::SkipNext => {
                self.send(ControlCommand::SkipNext);
            }
            UiCommand::SkipPrevious => {
                self.send(ControlCommand::SkipPrevious);
            }
        }
        Ok(())
    }

    /// Ask a running controller to broadcast its state
    ///
    /// When no controller runs, nothing is sent and the display falls back
    /// to the neutral stopped presentation. Returns whether a query went out.
    pub fn query_service_state(&self) -> bool {
        if !self.supervisor.is_running() {
            debug!("Controller not running");
            self.display.send_replace(DisplayState::stopped());
            return false;
        }
        self.send(ControlCommand::ServiceState)
    }

    /// Query and wait for the reply
    ///
    /// No reply within the liveness timeout counts as "not running".
    pub async fn await_service_state(&self) -> bool {
        let events = self.events();
        if !self.query_service_state() {
            return false;
        }
        wait_for_state(events, self.liveness_timeout).await
    }

    /// Unbind handlers and release the presentation address
    pub async fn close(&self) {
        self.bus.terminate();
        self.bus.close().await;
    }

    /// Launch the controller if needed and wait until it answers
    ///
    /// While waiting, the controller address is polled with `service_state`
    /// rather than probed, so the probe cannot race the controller's bind.
    async fn ensure_running(&self) -> Result<()> {
        if self.supervisor.is_running() {
            return Ok(());
        }
        self.supervisor.start()?;

        let deadline = Instant::now() + self.startup_timeout;
        while Instant::now() < deadline {
            let events = self.events();
            self.send(ControlCommand::ServiceState);
            if wait_for_state(events, STARTUP_POLL).await {
                debug!("Controller answering");
                return Ok(());
            }
        }
        warn!(
            "Controller did not answer within {:?}, sending anyway",
            self.startup_timeout
        );
        Ok(())
    }

    fn send(&self, command: ControlCommand) -> bool {
        if !self.has_permission() {
            debug!("No permission, dropping {:?}", command.topic());
            return false;
        }
        let topic = command.topic();
        match self
            .bus
            .send_message(self.controller_addr, &command.into_message())
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send /{}: {}", topic, e);
                false
            }
        }
    }

    /// Set which action the play/pause control offers next
    ///
    /// Broadcasts do not carry the play/pause state, so a front end that
    /// knows better (an explicit "pause" request) sets it before
    /// [`UiCommand::PlayPause`].
    pub fn set_show_pause(&self, show_pause: bool) {
        self.display.send_modify(|display| display.show_pause = show_pause);
    }
}

/// Wait for the `playlist_state` that closes a broadcast pair
async fn wait_for_state(mut events: broadcast::Receiver<StateBroadcast>, wait: Duration) -> bool {
    let reply = timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(StateBroadcast::PlaylistState(_)) => return true,
                Ok(StateBroadcast::TrackState(_)) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    })
    .await;
    reply.unwrap_or(false)
}

/// Fold one broadcast into the display
fn apply(
    display: &watch::Sender<DisplayState>,
    metadata: &dyn MetadataProvider,
    update: &StateBroadcast,
) {
    match update {
        StateBroadcast::TrackState(Some(track)) => {
            let info = metadata.track_info(track);
            display.send_modify(|display| {
                display.title = info.title;
                display.artist = info.artist;
                display.album_art = info.album_art;
            });
        }
        StateBroadcast::TrackState(None) => display.send_modify(|display| {
            display.title.clear();
            display.artist.clear();
            display.album_art = None;
        }),
        StateBroadcast::PlaylistState(summary) => {
            display.send_modify(|display| display.playlist = summary.clone())
        }
    }
}
