//! # BGMP Common Library
//!
//! Shared code for both BGMP processes:
//! - Protocol vocabulary (topics, control commands, state broadcasts)
//! - Message Bus and its datagram codec
//! - Configuration loading
//! - Logging setup

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use bus::{Message, MessageBus};
pub use error::{Error, Result};
pub use events::{ControlCommand, StateBroadcast, Topic, TrackRef};
