//! Controller service loop
//!
//! Wires bus topics to the playback engine and owns the process lifetime.
//!
//! Bus handlers run on the bus's receive task. They only decode the message
//! and forward a [`ControlCommand`] into a bounded queue; the engine is owned
//! by the single task running [`ControllerService::run`], which also consumes
//! backend signals. All state mutation therefore happens in one place.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use bgmp_common::{ControlCommand, MessageBus, Topic};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::playback::{MediaBackend, PlaybackEngine, SignalReceiver, StateSnapshot};

/// Whether the loop keeps running after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Terminate,
}

pub struct ControllerService<B: MediaBackend> {
    bus: MessageBus,
    presentation_addr: SocketAddr,
    engine: PlaybackEngine<B>,
    commands: mpsc::Receiver<ControlCommand>,
    signals: SignalReceiver,
    settle_delay: Duration,
}

impl<B: MediaBackend> ControllerService<B> {
    /// Bind the controller address and register the control topic handlers
    ///
    /// Fails if the address is taken, which usually means another
    /// controller is already running.
    pub async fn bind(config: &Config, backend: B, signals: SignalReceiver) -> Result<Self> {
        let bus = MessageBus::new("controller")?;
        bus.listen(config.controller_addr).await?;

        let (tx, commands) = mpsc::channel(config.service.command_queue_depth);
        for topic in Topic::CONTROL {
            let tx = tx.clone();
            bus.bind(topic.as_str(), move |message| {
                let command = match ControlCommand::from_message(&message) {
                    Ok(command) => command,
                    Err(e) => {
                        warn!("Dropping malformed /{}: {}", message.topic, e);
                        return;
                    }
                };
                match tx.try_send(command) {
                    Ok(()) => {}
                    Err(TrySendError::Full(command)) => {
                        warn!("Command queue full, dropping {:?}", command.topic());
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Service loop gone, dropping /{}", message.topic);
                    }
                }
            });
        }

        Ok(Self {
            bus,
            presentation_addr: config.presentation_addr,
            engine: PlaybackEngine::new(backend, config.service.max_consecutive_errors),
            commands,
            signals,
            settle_delay: config.service.settle_delay(),
        })
    }

    /// Address the controller is listening on
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bus.local_addr()
    }

    /// Run until a `terminate` message arrives
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until a `terminate` message arrives or `shutdown` resolves
    ///
    /// Either way the full shutdown sequence runs before returning.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Controller ready, broadcasting to {}", self.presentation_addr);

        loop {
            tokio::select! {
                Some(command) = self.commands.recv() => {
                    if self.dispatch(command) == Flow::Terminate {
                        info!("Terminate requested");
                        break;
                    }
                }
                Some(signal) = self.signals.recv() => {
                    if self.engine.handle_signal(signal) {
                        self.broadcast();
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                else => break,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn dispatch(&mut self, command: ControlCommand) -> Flow {
        debug!("Dispatching {:?}", command);
        match command {
            ControlCommand::AddPlaylist(tracks) => self.engine.append(tracks),
            ControlCommand::Play => self.engine.play(),
            ControlCommand::Pause => self.engine.pause(),
            ControlCommand::SkipNext => self.engine.skip_next(),
            ControlCommand::SkipPrevious => self.engine.skip_previous(),
            ControlCommand::ServiceState => {}
            ControlCommand::Terminate => return Flow::Terminate,
        }
        self.broadcast();
        Flow::Continue
    }

    /// Stop playback and tear down the transport, in that order
    ///
    /// The backend is released before the bus stops accepting messages,
    /// and the final broadcast goes out before the bus is closed.
    async fn shutdown(&mut self) {
        self.engine.terminate();
        self.broadcast();

        self.bus.terminate();
        tokio::time::sleep(self.settle_delay).await;
        self.bus.close().await;
        info!("Controller stopped");
    }

    fn broadcast(&self) {
        let snapshot: StateSnapshot = self.engine.snapshot();
        debug!(state = %snapshot.state, "{}", snapshot.summary);
        for broadcast in snapshot.broadcasts() {
            let message = broadcast.into_message();
            if let Err(e) = self.bus.send_message(self.presentation_addr, &message) {
                warn!("Failed to send /{}: {}", message.topic, e);
            }
        }
    }
}
