//! Media Backend contract
//!
//! The backend owns the platform playback resource. It is driven
//! synchronously by the playback engine and reports track completion or
//! failure asynchronously on a bounded channel handed to it at construction.
//! Every signal carries the session id passed to the `start` call that
//! produced it, so the engine can discard signals from superseded playbacks.

use bgmp_common::TrackRef;
use tokio::sync::mpsc;

use crate::error::Result;

/// Identifies one `start` call
pub type SessionId = u64;

/// Asynchronous notification from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSignal {
    /// Track played to the end
    Completed { session: SessionId },
    /// Playback failed mid-track (or could not begin)
    Failed { session: SessionId },
}

impl BackendSignal {
    pub fn session(&self) -> SessionId {
        match self {
            BackendSignal::Completed { session } | BackendSignal::Failed { session } => *session,
        }
    }
}

pub type SignalSender = mpsc::Sender<BackendSignal>;
pub type SignalReceiver = mpsc::Receiver<BackendSignal>;

/// Create the bounded signal channel shared by a backend and the service loop
pub fn signal_channel(depth: usize) -> (SignalSender, SignalReceiver) {
    mpsc::channel(depth)
}

/// Playback resource driven by the engine
pub trait MediaBackend: Send {
    /// Reset, load `track` and start playing it from the beginning
    fn start(&mut self, track: &TrackRef, session: SessionId) -> Result<()>;

    /// Pause the loaded track, keeping its position
    fn pause(&mut self) -> Result<()>;

    /// Continue the paused track from its position
    fn resume(&mut self) -> Result<()>;

    /// Stop playback; the track must be started again to play
    fn stop(&mut self) -> Result<()>;

    /// Return to the idle state after an error
    fn reset(&mut self) -> Result<()>;

    /// Free the platform resource; no further calls are valid
    fn release(&mut self) -> Result<()>;
}

impl<B: MediaBackend + ?Sized> MediaBackend for Box<B> {
    fn start(&mut self, track: &TrackRef, session: SessionId) -> Result<()> {
        (**self).start(track, session)
    }

    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }

    fn resume(&mut self) -> Result<()> {
        (**self).resume()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}
