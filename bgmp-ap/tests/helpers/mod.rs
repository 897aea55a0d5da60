//! Shared test fixtures for bgmp-ap integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bgmp_ap::error::{Error, Result};
use bgmp_ap::playback::{MediaBackend, SessionId};
use bgmp_common::{ControlCommand, MessageBus, StateBroadcast, Topic, TrackRef};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// One call made on the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Start(TrackRef, SessionId),
    Pause,
    Resume,
    Stop,
    Reset,
    Release,
}

/// Backend that records every call
///
/// Clones share the same log, so a test can keep a handle after moving the
/// backend into an engine or service.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Tracks passed to `start`, in order
    pub fn started(&self) -> Vec<TrackRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Start(track, _) => Some(track),
                _ => None,
            })
            .collect()
    }

    /// Session id of the most recent `start`
    pub fn last_session(&self) -> Option<SessionId> {
        self.calls().into_iter().rev().find_map(|call| match call {
            BackendCall::Start(_, session) => Some(session),
            _ => None,
        })
    }

    /// Make `start` fail for this track
    pub fn fail_start_of(&self, track: &str) {
        self.failing.lock().unwrap().insert(track.to_string());
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MediaBackend for RecordingBackend {
    fn start(&mut self, track: &TrackRef, session: SessionId) -> Result<()> {
        self.record(BackendCall::Start(track.clone(), session));
        if self.failing.lock().unwrap().contains(track.as_str()) {
            return Err(Error::Backend(format!("cannot prepare {}", track)));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(BackendCall::Pause);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.record(BackendCall::Resume);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record(BackendCall::Stop);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.record(BackendCall::Reset);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.record(BackendCall::Release);
        Ok(())
    }
}

pub fn tracks(names: &[&str]) -> Vec<TrackRef> {
    names.iter().map(|name| TrackRef::from(*name)).collect()
}

/// Stand-in for the presentation process: a bus that collects state broadcasts
pub struct Presentation {
    pub bus: MessageBus,
    pub addr: SocketAddr,
    rx: mpsc::UnboundedReceiver<StateBroadcast>,
}

impl Presentation {
    pub async fn listen() -> Self {
        let bus = MessageBus::new("test-presentation").expect("create bus");
        let addr = bus
            .listen("127.0.0.1:0".parse().unwrap())
            .await
            .expect("listen");

        let (tx, rx) = mpsc::unbounded_channel();
        for topic in Topic::BROADCAST {
            let tx = tx.clone();
            bus.bind(topic.as_str(), move |message| {
                let broadcast = StateBroadcast::from_message(&message).expect("valid broadcast");
                let _ = tx.send(broadcast);
            });
        }
        Self { bus, addr, rx }
    }

    pub async fn next(&mut self) -> Option<StateBroadcast> {
        timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next (track_state, playlist_state) pair
    pub async fn next_pair(&mut self) -> (Option<TrackRef>, String) {
        let track = match self.next().await {
            Some(StateBroadcast::TrackState(track)) => track,
            other => panic!("expected track_state, got {:?}", other),
        };
        let summary = match self.next().await {
            Some(StateBroadcast::PlaylistState(summary)) => summary,
            other => panic!("expected playlist_state, got {:?}", other),
        };
        (track, summary)
    }

    /// Send a control command from this bus to `target`
    pub fn send(&self, target: SocketAddr, command: ControlCommand) {
        self.bus
            .send_message(target, &command.into_message())
            .expect("send command");
    }
}
