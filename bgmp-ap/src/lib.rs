//! # BGMP Audio Player Library (bgmp-ap)
//!
//! The controller process: owns the playlist and the media backend, and is
//! driven entirely by control messages from the presentation process.
//!
//! **Architecture:** bus handlers → bounded command queue → single dispatch
//! task owning the [`playback::PlaybackEngine`] → state broadcasts back.

pub mod config;
pub mod error;
pub mod playback;
pub mod service;

pub use error::{Error, Result};
pub use service::ControllerService;
