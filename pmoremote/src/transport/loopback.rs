//! In-process transport.
//!
//! `LoopbackTransport` stands in for the socket: a responder closure plays
//! the server, `push` injects server broadcasts and `set_state` drives the
//! connection lifecycle. Every outgoing message is recorded so callers can
//! inspect what was sent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::{RemoteError, Result};
use crate::protocol::SocketMessage;
use crate::transport::{ConnectionState, Transport, TransportEvent};

const EVENT_CHANNEL_CAPACITY: usize = 256;

type Responder = dyn Fn(&SocketMessage) -> Option<SocketMessage> + Send + Sync;

pub struct LoopbackTransport {
    state: Mutex<ConnectionState>,
    events: broadcast::Sender<TransportEvent>,
    responder: Mutex<Option<Arc<Responder>>>,
    sent: Mutex<Vec<SocketMessage>>,
    latency: Mutex<Duration>,
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("state", &self.state())
            .field("sent", &self.sent.lock().map(|s| s.len()).unwrap_or(0))
            .finish()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            events,
            responder: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Installs the closure answering requests on behalf of the server.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&SocketMessage) -> Option<SocketMessage> + Send + Sync + 'static,
    {
        *self.responder.lock().expect("Responder mutex poisoned") = Some(Arc::new(responder));
    }

    /// Delay applied to awaited requests.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("Latency mutex poisoned") = latency;
    }

    pub fn set_state(&self, new: ConnectionState) {
        let old = {
            let mut state = self.state.lock().expect("State mutex poisoned");
            std::mem::replace(&mut *state, new)
        };

        if old != new {
            debug!(?old, ?new, "Loopback transport state changed");
            let _ = self.events.send(TransportEvent::StateChanged { new, old });
        }
    }

    /// Delivers a server-originated message to every subscriber.
    pub fn push(&self, message: SocketMessage) {
        let _ = self.events.send(TransportEvent::Message(message));
    }

    pub fn sent(&self) -> Vec<SocketMessage> {
        self.sent.lock().expect("Sent mutex poisoned").clone()
    }

    pub fn sent_named(&self, name: &str) -> Vec<SocketMessage> {
        self.sent
            .lock()
            .expect("Sent mutex poisoned")
            .iter()
            .filter(|m| m.is(name))
            .cloned()
            .collect()
    }

    pub fn count_sent(&self, name: &str) -> usize {
        self.sent
            .lock()
            .expect("Sent mutex poisoned")
            .iter()
            .filter(|m| m.is(name))
            .count()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().expect("Sent mutex poisoned").clear();
    }

    fn record(&self, message: &SocketMessage) {
        self.sent
            .lock()
            .expect("Sent mutex poisoned")
            .push(message.clone());
    }

    fn respond(&self, message: &SocketMessage) -> Option<SocketMessage> {
        let responder = self
            .responder
            .lock()
            .expect("Responder mutex poisoned")
            .clone();
        responder.and_then(|r| r(message))
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn state(&self) -> ConnectionState {
        *self.state.lock().expect("State mutex poisoned")
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    fn send(&self, message: SocketMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(RemoteError::NotConnected);
        }

        self.record(&message);
        if let Some(response) = self.respond(&message) {
            let _ = self.events.send(TransportEvent::Message(response));
        }
        Ok(())
    }

    async fn request(&self, message: SocketMessage) -> Result<SocketMessage> {
        if !self.is_connected() {
            return Err(RemoteError::NotConnected);
        }

        self.record(&message);

        let latency = *self.latency.lock().expect("Latency mutex poisoned");
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.respond(&message)
            .ok_or_else(|| RemoteError::NoResponse(message.name.clone()))
    }
}
