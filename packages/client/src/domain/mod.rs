//! Domain layer for the chat client.
//!
//! This module contains the chat model and the ports (traits) the use cases
//! depend on. It is independent of HTTP, WebSocket and terminal concerns.

pub mod entity;
pub mod error;
pub mod repository;
pub mod transport;
pub mod value_object;

pub use entity::{
    ChatUser, ChatUserRecord, ConversationHistory, FALLBACK_CONTACT_NAME, Message,
};
pub use error::{MalformedRecord, StoreError, TransportError, ValueObjectError};
pub use repository::MessageStore;
#[cfg(test)]
pub use repository::MockMessageStore;
pub use transport::{ConnectionId, ConnectionStatus, ListenerId, RealtimeTransport};
pub use value_object::{MessageContent, MessageId, RoomName, Timestamp, UserId};
