//! Real-time transport port.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use super::{entity::Message, error::TransportError, value_object::RoomName};

/// Identity of one socket connection.
///
/// A new id is assigned every time a connection is (re)established, so two
/// calls returning the same id were served by the same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Token identifying a listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Connectivity of the real-time channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        write!(f, "{}", label)
    }
}

/// Room-scoped pub/sub over a single shared connection.
///
/// Listener registration is single-slot: registering replaces the previous
/// listener, whose channel is closed.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Return the active connection, opening one if needed
    async fn connect_socket(&self) -> Result<ConnectionId, TransportError>;

    /// Close the active connection, if any
    async fn disconnect_socket(&self);

    /// Ask the server to add this connection to `room`; no-op when disconnected
    async fn join_room(&self, room: &RoomName);

    /// Ask the server to remove this connection from `room`; no-op when disconnected
    async fn leave_room(&self, room: &RoomName);

    /// Install the listener for `receiveMessage`, replacing any previous one
    fn on_receive_message(&self, listener: mpsc::UnboundedSender<Message>) -> ListenerId;

    /// Remove the `receiveMessage` listener if `id` still owns the slot
    fn off_receive_message(&self, id: ListenerId);

    /// Install the listener for `conversationUpdate`, replacing any previous one
    fn on_conversation_update(&self, listener: mpsc::UnboundedSender<()>) -> ListenerId;

    /// Remove the `conversationUpdate` listener if `id` still owns the slot
    fn off_conversation_update(&self, id: ListenerId);

    /// Current connectivity
    fn status(&self) -> ConnectionStatus;

    /// Watch connectivity changes
    fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus>;
}
