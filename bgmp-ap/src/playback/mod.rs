//! Playback: playlist, media backend contract and the state machine driving them

pub mod backend;
pub mod engine;
pub mod playlist;
pub mod simulated;

pub use backend::{signal_channel, BackendSignal, MediaBackend, SessionId, SignalReceiver, SignalSender};
pub use engine::{PlaybackEngine, PlaybackState, StateSnapshot};
pub use playlist::Playlist;
pub use simulated::SimulatedBackend;
