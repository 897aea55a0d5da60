//! Message Bus
//!
//! Point-to-point, fire-and-forget transport between the two BGMP processes.
//! Each process owns one bus: it listens on its own address and sends to the
//! peer's address. Messages are single UDP datagrams (see [`codec`]).
//!
//! Delivery runs on a background task per bus; handlers are called from that
//! task, one message at a time, in arrival order. Handlers must not block.

pub mod codec;

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket as StdUdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

/// A topic-addressed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<Vec<u8>>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: Vec<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Message handler bound to a topic
pub type Handler = Arc<dyn Fn(Message) + Send + Sync>;

type HandlerMap = Arc<RwLock<HashMap<String, Handler>>>;

/// Receiving side, present between `listen` and `close`
struct Inbound {
    local_addr: SocketAddr,
    socket: Arc<UdpSocket>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// One process's end of the message transport
pub struct MessageBus {
    /// Name used in log lines ("controller", "presentation")
    name: String,
    handlers: HandlerMap,
    outbound: StdUdpSocket,
    inbound: Mutex<Option<Inbound>>,
    closed: AtomicBool,
}

impl MessageBus {
    /// Create a bus that can send immediately and receive after [`listen`](Self::listen)
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let outbound = StdUdpSocket::bind("0.0.0.0:0")?;
        // send() is fire-and-forget: a full socket buffer drops instead of blocking
        outbound.set_nonblocking(true)?;

        Ok(Self {
            name: name.into(),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            outbound,
            inbound: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Bind the receiver at `addr` and start the delivery task
    ///
    /// Returns the bound address (useful when `addr` has port 0).
    /// Fails with [`Error::AddressInUse`] if another process holds the address.
    pub async fn listen(&self, addr: SocketAddr) -> Result<SocketAddr> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Transport("bus is closed".to_string()));
        }
        if self.lock_inbound().is_some() {
            return Err(Error::Transport(format!("{} bus is already listening", self.name)));
        }

        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                Error::AddressInUse(addr)
            } else {
                Error::Io(e)
            }
        })?;
        let local_addr = socket.local_addr()?;
        let socket = Arc::new(socket);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(receive_loop(
            self.name.clone(),
            Arc::clone(&socket),
            Arc::clone(&self.handlers),
            shutdown.clone(),
        ));

        info!("{} bus listening on {}", self.name, local_addr);
        *self.lock_inbound() = Some(Inbound {
            local_addr,
            socket,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Register the handler for `topic`, replacing any earlier one
    pub fn bind<F>(&self, topic: &str, handler: F)
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let previous = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.to_string(), Arc::new(handler));
        if previous.is_some() {
            debug!("{} bus: replaced handler for /{}", self.name, topic);
        }
    }

    /// Send `payload` to `target` under `topic` without waiting for delivery
    pub fn send(&self, target: SocketAddr, topic: &str, payload: Vec<Vec<u8>>) -> Result<()> {
        self.send_message(target, &Message::new(topic, payload))
    }

    /// Send a prepared message without waiting for delivery
    pub fn send_message(&self, target: SocketAddr, message: &Message) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Transport("bus is closed".to_string()));
        }
        if target.is_ipv6() {
            return Err(Error::Transport(format!(
                "IPv6 endpoint {} is not supported",
                target
            )));
        }

        let datagram = codec::encode(message)?;
        match self.outbound.send_to(&datagram, target) {
            Ok(_) => {
                trace!("{} bus: sent /{} to {}", self.name, message.topic, target);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(Error::Transport(
                format!("send buffer full, /{} dropped", message.topic),
            )),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Address the receiver is bound to, if listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_inbound().as_ref().map(|inbound| inbound.local_addr)
    }

    /// Unbind all handlers and stop accepting messages
    ///
    /// The socket stays bound until [`close`](Self::close).
    pub fn terminate(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if let Some(inbound) = self.lock_inbound().as_ref() {
            inbound.shutdown.cancel();
        }
        debug!("{} bus terminated", self.name);
    }

    /// Release the transport
    ///
    /// Sending after close returns [`Error::Transport`].
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let inbound = self.lock_inbound().take();
        if let Some(inbound) = inbound {
            inbound.shutdown.cancel();
            if let Err(e) = inbound.task.await {
                warn!("{} bus receive task ended abnormally: {}", self.name, e);
            }
            drop(inbound.socket);
            info!("{} bus closed ({})", self.name, inbound.local_addr);
        }
    }

    fn lock_inbound(&self) -> std::sync::MutexGuard<'_, Option<Inbound>> {
        self.inbound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MessageBus {
    fn drop(&mut self) {
        if let Some(inbound) = self.lock_inbound().as_ref() {
            inbound.shutdown.cancel();
        }
    }
}

async fn receive_loop(
    name: String,
    socket: Arc<UdpSocket>,
    handlers: HandlerMap,
    shutdown: CancellationToken,
) {
    let mut buf = vec![0u8; codec::MAX_DATAGRAM];
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => dispatch(&name, &handlers, &buf[..len], from),
                // ICMP port-unreachable can surface here on some platforms
                Err(e) => warn!("{} bus receive error: {}", name, e),
            },
        }
    }
    debug!("{} bus receive loop stopped", name);
}

fn dispatch(name: &str, handlers: &HandlerMap, datagram: &[u8], from: SocketAddr) {
    let message = match codec::decode(datagram) {
        Ok(message) => message,
        Err(e) => {
            warn!("{} bus: dropped datagram from {}: {}", name, from, e);
            return;
        }
    };

    let handler = handlers
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&message.topic)
        .cloned();

    match handler {
        Some(handler) => {
            trace!("{} bus: /{} from {}", name, message.topic, from);
            handler(message);
        }
        None => debug!("{} bus: no handler for /{}", name, message.topic),
    }
}
