//! Shared test fixtures for bgmp-ui integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bgmp_common::{ControlCommand, MessageBus, StateBroadcast, Topic};
use bgmp_ui::config::Config;
use bgmp_ui::supervisor::ServiceSupervisor;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Supervisor with a settable running flag
///
/// `start` just flips the flag; the fake controller is already listening.
#[derive(Debug, Default)]
pub struct FakeSupervisor {
    running: AtomicBool,
    starts: AtomicUsize,
}

impl FakeSupervisor {
    pub fn new(running: bool) -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(running),
            starts: AtomicUsize::new(0),
        })
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl ServiceSupervisor for FakeSupervisor {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start(&self) -> bgmp_ui::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Stand-in for the controller: records control commands and can answer
/// `service_state` with a fixed broadcast pair
pub struct FakeController {
    pub bus: MessageBus,
    pub addr: SocketAddr,
    rx: mpsc::UnboundedReceiver<ControlCommand>,
    answer: Arc<Mutex<Option<(SocketAddr, String)>>>,
}

impl FakeController {
    pub async fn listen() -> Self {
        let bus = MessageBus::new("test-controller").expect("create bus");
        let addr = bus
            .listen("127.0.0.1:0".parse().unwrap())
            .await
            .expect("listen");
        let (tx, rx) = mpsc::unbounded_channel();
        let answer: Arc<Mutex<Option<(SocketAddr, String)>>> = Arc::new(Mutex::new(None));
        let outbound = Arc::new(MessageBus::new("test-controller-out").expect("create bus"));

        for topic in Topic::CONTROL {
            let tx = tx.clone();
            let answer = Arc::clone(&answer);
            let outbound = Arc::clone(&outbound);
            bus.bind(topic.as_str(), move |message| {
                let command = ControlCommand::from_message(&message).expect("valid command");
                if command == ControlCommand::ServiceState {
                    if let Some((target, summary)) = answer.lock().unwrap().clone() {
                        send_pair(&outbound, target, None, &summary);
                    }
                }
                let _ = tx.send(command);
            });
        }
        Self {
            bus,
            addr,
            rx,
            answer,
        }
    }

    /// Answer every `service_state` by broadcasting `summary` to `target`
    pub fn answer_to(&self, target: SocketAddr, summary: &str) {
        *self.answer.lock().unwrap() = Some((target, summary.to_string()));
    }

    pub async fn next(&mut self) -> Option<ControlCommand> {
        timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next command that is not a `service_state` poll
    pub async fn next_non_query(&mut self) -> Option<ControlCommand> {
        loop {
            match self.next().await? {
                ControlCommand::ServiceState => continue,
                command => return Some(command),
            }
        }
    }

    /// Whether nothing arrives within `wait`
    pub async fn is_quiet(&mut self, wait: Duration) -> bool {
        timeout(wait, self.rx.recv()).await.is_err()
    }

    pub fn broadcast(&self, target: SocketAddr, broadcast: StateBroadcast) {
        self.bus
            .send_message(target, &broadcast.into_message())
            .expect("send broadcast");
    }
}

fn send_pair(bus: &MessageBus, target: SocketAddr, track: Option<&str>, summary: &str) {
    let pair = [
        StateBroadcast::TrackState(track.map(Into::into)),
        StateBroadcast::PlaylistState(summary.to_string()),
    ];
    for broadcast in pair {
        let _ = bus.send_message(target, &broadcast.into_message());
    }
}

pub fn test_config(controller_addr: SocketAddr) -> Config {
    Config {
        controller_addr,
        presentation_addr: "127.0.0.1:0".parse().unwrap(),
        liveness_timeout: Duration::from_millis(200),
        startup_timeout: Duration::from_secs(1),
        service_binary: None,
        config_file: None,
    }
}
