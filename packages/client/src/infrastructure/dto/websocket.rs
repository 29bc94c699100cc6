//! Socket channel DTOs.
//!
//! Every frame is a JSON text envelope `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use super::http::MessageDto;

pub const EVENT_JOIN_ROOM: &str = "joinRoom";
pub const EVENT_LEAVE_ROOM: &str = "leaveRoom";
pub const EVENT_RECEIVE_MESSAGE: &str = "receiveMessage";
pub const EVENT_CONVERSATION_UPDATE: &str = "conversationUpdate";
pub const EVENT_JOINED_ROOM: &str = "joinedRoom";

/// Events sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Payload: room name
    JoinRoom(String),
    /// Payload: room name
    LeaveRoom(String),
}

/// Untyped frame, used to read the event name before decoding the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

/// Events pushed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A persisted message broadcast to a room
    ReceiveMessage(MessageDto),
    /// Something changed in the conversation list; payload is ignored
    ConversationUpdate,
    /// Acknowledgement of `joinRoom`
    JoinedRoom(String),
    /// Event this client does not handle
    Unknown(String),
}

impl ServerEvent {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the frame is not an envelope or a known
    /// event carries an unusable payload
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let event = match envelope.event.as_str() {
            EVENT_RECEIVE_MESSAGE => Self::ReceiveMessage(serde_json::from_value(envelope.data)?),
            EVENT_CONVERSATION_UPDATE => Self::ConversationUpdate,
            EVENT_JOINED_ROOM => Self::JoinedRoom(serde_json::from_value(envelope.data)?),
            _ => Self::Unknown(envelope.event),
        };
        Ok(event)
    }
}
