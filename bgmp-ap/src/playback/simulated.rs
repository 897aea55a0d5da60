//! Clock-driven media backend
//!
//! Audio decoding is outside this project, so the controller binary ships a
//! backend that models playback timing only: each track "plays" for a fixed
//! duration, pause/resume keep the remaining time, and local file references
//! that do not exist fail the way an unplayable file would.

use std::path::PathBuf;
use std::time::Duration;

use bgmp_common::TrackRef;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::backend::{BackendSignal, MediaBackend, SessionId, SignalSender};
use crate::error::{Error, Result};

struct ActivePlayback {
    session: SessionId,
    track: TrackRef,
    remaining: Duration,
    /// Set while the clock is running
    resumed_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl ActivePlayback {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

pub struct SimulatedBackend {
    track_duration: Duration,
    signals: SignalSender,
    playback: Option<ActivePlayback>,
    released: bool,
}

impl SimulatedBackend {
    pub fn new(track_duration: Duration, signals: SignalSender) -> Self {
        Self {
            track_duration,
            signals,
            playback: None,
            released: false,
        }
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.playback.is_some()
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.resumed_at.is_some())
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.released {
            Err(Error::BackendReleased)
        } else {
            Ok(())
        }
    }

    fn emit_after(&self, delay: Duration, signal: BackendSignal) -> JoinHandle<()> {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if signals.send(signal).await.is_err() {
                debug!("Signal receiver gone, dropping {:?}", signal);
            }
        })
    }

    fn clear(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.cancel_timer();
        }
    }
}

/// Local filesystem path named by a track reference, if it names one
///
/// `file://` URIs and bare paths are local; other schemes are assumed playable.
fn local_path(track: &TrackRef) -> Option<PathBuf> {
    let value = track.as_str();
    if let Some(path) = value.strip_prefix("file://") {
        Some(PathBuf::from(path))
    } else if value.contains("://") {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

impl MediaBackend for SimulatedBackend {
    fn start(&mut self, track: &TrackRef, session: SessionId) -> Result<()> {
        self.ensure_not_released()?;
        self.clear();

        let missing = local_path(track).is_some_and(|path| !path.exists());
        let timer = if missing {
            warn!(track = %track, "Track file not found");
            self.emit_after(Duration::ZERO, BackendSignal::Failed { session })
        } else {
            self.emit_after(self.track_duration, BackendSignal::Completed { session })
        };

        debug!(track = %track, session, "Simulated playback started");
        self.playback = Some(ActivePlayback {
            session,
            track: track.clone(),
            remaining: self.track_duration,
            resumed_at: Some(Instant::now()),
            timer: Some(timer),
        });
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        match self.playback.as_mut() {
            Some(playback) => {
                if let Some(resumed_at) = playback.resumed_at.take() {
                    playback.cancel_timer();
                    playback.remaining = playback.remaining.saturating_sub(resumed_at.elapsed());
                    debug!(
                        track = %playback.track,
                        session = playback.session,
                        remaining_ms = playback.remaining.as_millis() as u64,
                        "Simulated playback paused"
                    );
                }
                Ok(())
            }
            None => Err(Error::Backend("pause with nothing loaded".to_string())),
        }
    }

    fn resume(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        let (session, remaining) = match self.playback.as_ref() {
            Some(playback) if playback.resumed_at.is_none() => (playback.session, playback.remaining),
            Some(_) => return Ok(()),
            None => return Err(Error::Backend("resume with nothing loaded".to_string())),
        };

        let timer = self.emit_after(remaining, BackendSignal::Completed { session });
        if let Some(playback) = self.playback.as_mut() {
            playback.resumed_at = Some(Instant::now());
            playback.timer = Some(timer);
        }
        debug!(session, "Simulated playback resumed");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        self.clear();
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        self.clear();
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.clear();
        self.released = true;
        Ok(())
    }
}

impl Drop for SimulatedBackend {
    fn drop(&mut self) {
        self.clear();
    }
}
