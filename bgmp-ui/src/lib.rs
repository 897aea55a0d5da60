//! # BGMP User Interface Library (bgmp-ui)
//!
//! The presentation process: sends user intents to the controller, launches
//! it on demand and shows the state it broadcasts back.

pub mod config;
pub mod display;
pub mod error;
pub mod interactive;
pub mod metadata;
pub mod picker;
pub mod proxy;
pub mod supervisor;

pub use display::DisplayState;
pub use error::{Error, Result};
pub use proxy::{PresentationProxy, UiCommand};
