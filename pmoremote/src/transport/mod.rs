//! Messaging transport seam.
//!
//! The socket itself (connection, authentication, reconnection and backoff)
//! lives outside this crate. Components only rely on the [`Transport`]
//! trait: a connection state, a broadcast stream of events, fire-and-forget
//! sends whose replies come back as events, and awaited request/response.

mod loopback;

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::Result;
use crate::protocol::SocketMessage;

pub use loopback::LoopbackTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    StateChanged {
        new: ConnectionState,
        old: ConnectionState,
    },
    /// A response or a server push.
    Message(SocketMessage),
}

#[async_trait]
pub trait Transport: Debug + Send + Sync {
    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Every subscriber receives every event emitted after the call.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;

    /// Sends without waiting. A reply, if any, is delivered to subscribers
    /// as a [`TransportEvent::Message`].
    fn send(&self, message: SocketMessage) -> Result<()>;

    /// Sends and waits for the matching response. Dropping the future
    /// abandons the request.
    async fn request(&self, message: SocketMessage) -> Result<SocketMessage>;
}
