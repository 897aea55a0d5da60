//! Playback state machine
//!
//! Owns the playlist and the media backend, and applies control triggers and
//! backend signals to them. Every method is called from the service loop's
//! single dispatch task, so no locking happens here.
//!
//! Transitions:
//!
//! | From           | Trigger             | To                         |
//! |----------------|---------------------|----------------------------|
//! | Stopped        | play (non-empty)    | Playing                    |
//! | Playing        | pause               | Paused                     |
//! | Paused         | play                | Playing (resumed)          |
//! | Playing/Paused | skip next/previous  | unchanged, Stopped if empty|
//! | Playing        | completion          | Playing (next track)       |
//! | Playing/Paused | backend error       | advance, or Stopped        |
//! | any            | terminate           | Terminated                 |

use std::fmt;

use bgmp_common::{StateBroadcast, TrackRef};
use tracing::{debug, info, warn};

use super::backend::{BackendSignal, MediaBackend, SessionId};
use super::playlist::Playlist;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
    /// Reached by `terminate`; no further transitions
    Terminated,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Terminated => write!(f, "terminated"),
        }
    }
}

/// What the presentation process is told after a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub state: PlaybackState,
    pub track: Option<TrackRef>,
    pub summary: String,
}

impl StateSnapshot {
    /// Broadcasts in send order: track first, then playlist summary
    pub fn broadcasts(&self) -> [StateBroadcast; 2] {
        [
            StateBroadcast::TrackState(self.track.clone()),
            StateBroadcast::PlaylistState(self.summary.clone()),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

pub struct PlaybackEngine<B: MediaBackend> {
    playlist: Playlist,
    state: PlaybackState,
    backend: B,
    backend_released: bool,

    /// Backend holds the current track and can resume it
    loaded: bool,

    /// Id of the most recent `start`; older signals are stale
    session: SessionId,

    consecutive_errors: usize,
    max_consecutive_errors: Option<usize>,
}

impl<B: MediaBackend> PlaybackEngine<B> {
    pub fn new(backend: B, max_consecutive_errors: Option<usize>) -> Self {
        Self {
            playlist: Playlist::new(),
            state: PlaybackState::Stopped,
            backend,
            backend_released: false,
            loaded: false,
            session: 0,
            consecutive_errors: 0,
            max_consecutive_errors,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state: self.state,
            track: self.playlist.current().cloned(),
            summary: self.playlist.summary(),
        }
    }

    /// Append tracks in order; playback is not started
    pub fn append(&mut self, tracks: Vec<TrackRef>) {
        if self.ignore_when_terminated("add_playlist") {
            return;
        }
        let count = tracks.len();
        for track in tracks {
            self.playlist.append(track);
        }
        info!("Added {} tracks, playlist now {}", count, self.playlist.len());
    }

    pub fn play(&mut self) {
        if self.ignore_when_terminated("play") {
            return;
        }
        self.consecutive_errors = 0;

        match self.state {
            PlaybackState::Playing => debug!("Play while already playing"),
            PlaybackState::Paused if self.loaded => match self.backend.resume() {
                Ok(()) => {
                    self.transition(PlaybackState::Playing);
                }
                Err(e) => {
                    warn!("Backend resume failed, restarting track: {}", e);
                    self.start_current();
                }
            },
            PlaybackState::Paused | PlaybackState::Stopped => {
                if self.playlist.is_empty() {
                    debug!("Play with empty playlist");
                } else {
                    self.start_current();
                }
            }
            PlaybackState::Terminated => {}
        }
    }

    pub fn pause(&mut self) {
        if self.ignore_when_terminated("pause") {
            return;
        }
        if self.state != PlaybackState::Playing {
            debug!("Pause while {}", self.state);
            return;
        }
        if let Err(e) = self.backend.pause() {
            warn!("Backend pause failed: {}", e);
        }
        self.transition(PlaybackState::Paused);
    }

    pub fn skip_next(&mut self) {
        self.skip(Direction::Next);
    }

    pub fn skip_previous(&mut self) {
        self.skip(Direction::Previous);
    }

    fn skip(&mut self, direction: Direction) {
        if self.ignore_when_terminated("skip") {
            return;
        }
        if self.playlist.is_empty() {
            debug!("Skip with empty playlist");
            return;
        }
        self.consecutive_errors = 0;

        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.stop_backend();
        }
        match direction {
            Direction::Next => self.playlist.advance(),
            Direction::Previous => self.playlist.retreat(),
        }
        debug!("Skipped {:?} to {:?}", direction, self.playlist.cursor());

        // Paused stays paused on the new track; Playing and Stopped start it
        if self.state != PlaybackState::Paused {
            self.start_current();
        }
    }

    /// Apply a backend signal
    ///
    /// Returns true if the signal changed state (and should be broadcast).
    pub fn handle_signal(&mut self, signal: BackendSignal) -> bool {
        if signal.session() != self.session || !self.loaded {
            debug!("Ignoring stale {:?} (current session {})", signal, self.session);
            return false;
        }

        match signal {
            BackendSignal::Completed { .. } => {
                if self.state != PlaybackState::Playing {
                    debug!("Ignoring completion while {}", self.state);
                    return false;
                }
                self.consecutive_errors = 0;
                self.loaded = false;
                self.playlist.advance();
                self.start_current();
            }
            BackendSignal::Failed { .. } => {
                warn!(
                    track = %self.playlist.current().map(TrackRef::as_str).unwrap_or(""),
                    "Backend reported a playback error, skipping track"
                );
                if let Err(e) = self.backend.reset() {
                    warn!("Backend reset failed: {}", e);
                }
                self.loaded = false;
                if self.record_error() {
                    self.playlist.advance();
                    if self.state == PlaybackState::Playing {
                        self.start_current();
                    }
                }
            }
        }
        true
    }

    /// Clear the playlist, stop and release the backend
    ///
    /// Safe to call repeatedly.
    pub fn terminate(&mut self) {
        self.playlist.clear();
        self.loaded = false;
        if !self.backend_released {
            if let Err(e) = self.backend.stop() {
                warn!("Backend stop failed during shutdown: {}", e);
            }
            if let Err(e) = self.backend.release() {
                warn!("Backend release failed: {}", e);
            }
            self.backend_released = true;
        }
        self.transition(PlaybackState::Terminated);
    }

    /// Start the backend on the current track
    ///
    /// A start failure counts as a backend error and moves on to the next
    /// track, until the consecutive-error limit stops playback.
    fn start_current(&mut self) {
        loop {
            let Some(track) = self.playlist.current().cloned() else {
                self.loaded = false;
                self.transition(PlaybackState::Stopped);
                return;
            };

            self.session += 1;
            match self.backend.start(&track, self.session) {
                Ok(()) => {
                    info!(track = %track, "Playing track {}", self.playlist.summary());
                    self.loaded = true;
                    self.transition(PlaybackState::Playing);
                    return;
                }
                Err(e) => {
                    warn!(track = %track, "Backend failed to start track: {}", e);
                    if let Err(e) = self.backend.reset() {
                        warn!("Backend reset failed: {}", e);
                    }
                    self.loaded = false;
                    if !self.record_error() {
                        return;
                    }
                    self.playlist.advance();
                }
            }
        }
    }

    /// Count a backend error; stops playback and returns false at the limit
    fn record_error(&mut self) -> bool {
        self.consecutive_errors += 1;
        let limit = self.error_limit();
        if self.consecutive_errors >= limit {
            warn!(
                "Stopping playback after {} consecutive backend errors",
                self.consecutive_errors
            );
            self.consecutive_errors = 0;
            self.stop_backend();
            self.transition(PlaybackState::Stopped);
            false
        } else {
            true
        }
    }

    fn error_limit(&self) -> usize {
        let lap = self.playlist.len().max(1);
        self.max_consecutive_errors.map_or(lap, |cap| cap.min(lap))
    }

    fn stop_backend(&mut self) {
        if let Err(e) = self.backend.stop() {
            warn!("Backend stop failed: {}", e);
        }
        self.loaded = false;
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            info!("Playback state: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn ignore_when_terminated(&self, trigger: &str) -> bool {
        if self.state == PlaybackState::Terminated {
            debug!("Ignoring {} after terminate", trigger);
            true
        } else {
            false
        }
    }
}
