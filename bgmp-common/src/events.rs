//! Protocol vocabulary shared by the controller and presentation processes
//!
//! The topic set is closed and versionless. Control commands flow from the
//! presentation process to the controller; state broadcasts flow back.
//! Both are typed views over a raw [`Message`].

use std::fmt;
use std::str::FromStr;

use crate::bus::Message;
use crate::error::{Error, Result};

/// Opaque identifier for one playable item
///
/// Transported as a UTF-8 byte string. Equality is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackRef(String);

impl TrackRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode a track reference from a payload element
    fn from_payload(topic: Topic, bytes: &[u8]) -> Result<Self> {
        std::str::from_utf8(bytes)
            .map(|s| Self(s.to_string()))
            .map_err(|e| Error::InvalidPayload {
                topic: topic.to_string(),
                reason: format!("track reference is not UTF-8: {}", e),
            })
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TrackRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Message topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    AddPlaylist,
    Terminate,
    Play,
    Pause,
    SkipNext,
    SkipPrevious,
    ServiceState,
    TrackState,
    PlaylistState,
}

impl Topic {
    /// Topics handled by the controller process
    pub const CONTROL: [Topic; 7] = [
        Topic::AddPlaylist,
        Topic::Terminate,
        Topic::Play,
        Topic::Pause,
        Topic::SkipNext,
        Topic::SkipPrevious,
        Topic::ServiceState,
    ];

    /// Topics handled by the presentation process
    pub const BROADCAST: [Topic; 2] = [Topic::TrackState, Topic::PlaylistState];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::AddPlaylist => "add_playlist",
            Topic::Terminate => "terminate",
            Topic::Play => "play",
            Topic::Pause => "pause",
            Topic::SkipNext => "skip_next",
            Topic::SkipPrevious => "skip_previous",
            Topic::ServiceState => "service_state",
            Topic::TrackState => "track_state",
            Topic::PlaylistState => "playlist_state",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Topic::CONTROL
            .iter()
            .chain(Topic::BROADCAST.iter())
            .find(|topic| topic.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownTopic(s.to_string()))
    }
}

/// Presentation → controller intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Append each track to the playlist, in order
    AddPlaylist(Vec<TrackRef>),
    Terminate,
    Play,
    Pause,
    SkipNext,
    SkipPrevious,
    /// Liveness query; the controller answers with a state broadcast
    ServiceState,
}

impl ControlCommand {
    pub fn topic(&self) -> Topic {
        match self {
            ControlCommand::AddPlaylist(_) => Topic::AddPlaylist,
            ControlCommand::Terminate => Topic::Terminate,
            ControlCommand::Play => Topic::Play,
            ControlCommand::Pause => Topic::Pause,
            ControlCommand::SkipNext => Topic::SkipNext,
            ControlCommand::SkipPrevious => Topic::SkipPrevious,
            ControlCommand::ServiceState => Topic::ServiceState,
        }
    }

    pub fn into_message(self) -> Message {
        let topic = self.topic();
        let payload = match self {
            ControlCommand::AddPlaylist(tracks) => tracks
                .into_iter()
                .map(|t| t.0.into_bytes())
                .collect(),
            _ => Vec::new(),
        };
        Message::new(topic.as_str(), payload)
    }

    /// Interpret a received message as a control command
    ///
    /// Payload elements on argument-less topics are ignored.
    pub fn from_message(message: &Message) -> Result<Self> {
        let topic: Topic = message.topic.parse()?;
        let command = match topic {
            Topic::AddPlaylist => {
                let tracks = message
                    .payload
                    .iter()
                    .map(|bytes| TrackRef::from_payload(topic, bytes))
                    .collect::<Result<Vec<_>>>()?;
                ControlCommand::AddPlaylist(tracks)
            }
            Topic::Terminate => ControlCommand::Terminate,
            Topic::Play => ControlCommand::Play,
            Topic::Pause => ControlCommand::Pause,
            Topic::SkipNext => ControlCommand::SkipNext,
            Topic::SkipPrevious => ControlCommand::SkipPrevious,
            Topic::ServiceState => ControlCommand::ServiceState,
            Topic::TrackState | Topic::PlaylistState => {
                return Err(Error::InvalidPayload {
                    topic: topic.to_string(),
                    reason: "broadcast topic sent to controller".to_string(),
                })
            }
        };
        Ok(command)
    }
}

/// `playlist_state` text when there is nothing to play
pub const EMPTY_PLAYLIST_SUMMARY: &str = "The Music Playlist is Empty.";

/// Controller → presentation state broadcasts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBroadcast {
    /// Current track, `None` when the playlist is empty (sent as an empty string)
    TrackState(Option<TrackRef>),
    /// Human-readable playlist summary
    PlaylistState(String),
}

impl StateBroadcast {
    pub fn topic(&self) -> Topic {
        match self {
            StateBroadcast::TrackState(_) => Topic::TrackState,
            StateBroadcast::PlaylistState(_) => Topic::PlaylistState,
        }
    }

    pub fn into_message(self) -> Message {
        let topic = self.topic();
        let element = match self {
            StateBroadcast::TrackState(track) => track.map(|t| t.0).unwrap_or_default(),
            StateBroadcast::PlaylistState(summary) => summary,
        };
        Message::new(topic.as_str(), vec![element.into_bytes()])
    }

    pub fn from_message(message: &Message) -> Result<Self> {
        let topic: Topic = message.topic.parse()?;
        let element = match message.payload.as_slice() {
            [single] => single,
            other => {
                return Err(Error::InvalidPayload {
                    topic: topic.to_string(),
                    reason: format!("expected 1 element, got {}", other.len()),
                })
            }
        };
        match topic {
            Topic::TrackState => {
                let track = TrackRef::from_payload(topic, element)?;
                Ok(StateBroadcast::TrackState(
                    (!track.as_str().is_empty()).then_some(track),
                ))
            }
            Topic::PlaylistState => Ok(StateBroadcast::PlaylistState(
                String::from_utf8_lossy(element).into_owned(),
            )),
            _ => Err(Error::InvalidPayload {
                topic: topic.to_string(),
                reason: "control topic sent to presentation".to_string(),
            }),
        }
    }
}
