//! Core domain models for the chat client.

use serde::{Deserialize, Serialize};

use super::{
    error::MalformedRecord,
    value_object::{MessageContent, MessageId, RoomName, Timestamp, UserId},
};

/// Display name used when a contact's name cannot be resolved
pub const FALLBACK_CONTACT_NAME: &str = "User";

/// A one-to-one chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned id, or a temporary id for optimistic entries
    pub id: MessageId,
    /// Author of the message
    pub sender_id: UserId,
    /// Addressee of the message
    pub receiver_id: UserId,
    /// Trimmed, non-empty text
    pub content: MessageContent,
    /// When the message was sent (server time once confirmed)
    pub timestamp: Timestamp,
    /// Whether the receiver has acknowledged the message
    #[serde(default)]
    pub read: bool,
    /// Denormalized display name of the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

impl Message {
    /// Build a client-side optimistic message with a temporary id
    pub fn optimistic(sender_id: UserId, receiver_id: UserId, content: MessageContent) -> Self {
        Self {
            id: MessageId::temporary(),
            sender_id,
            receiver_id,
            content,
            timestamp: Timestamp::now(),
            read: false,
            sender_name: None,
        }
    }

    /// Room of the conversation this message belongs to
    pub fn room(&self) -> RoomName {
        RoomName::for_participants(&self.sender_id, &self.receiver_id)
    }

    /// Whether the message has not been confirmed by the server yet
    pub fn is_optimistic(&self) -> bool {
        self.id.is_temporary()
    }
}

/// Raw conversation summary as returned by the server.
///
/// Every field is optional; [`ChatUser::try_from`] validates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUserRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub unread_count: Option<u32>,
}

/// Conversation summary (server-computed projection)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    /// The other participant
    pub id: UserId,
    /// Display name of the other participant
    pub name: String,
    /// Role of the other participant (student, advisor, ...)
    pub role: Option<String>,
    /// Preview of the latest message
    pub last_message: Option<String>,
    /// Time of the latest message
    pub timestamp: Option<Timestamp>,
    /// Messages from this contact not yet read
    pub unread_count: u32,
}

impl TryFrom<ChatUserRecord> for ChatUser {
    type Error = MalformedRecord;

    fn try_from(record: ChatUserRecord) -> Result<Self, Self::Error> {
        let id = record.id.ok_or(MalformedRecord::MissingField("id"))?;
        let id = UserId::new(id)
            .map_err(|source| MalformedRecord::InvalidField { field: "id", source })?;
        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(MalformedRecord::MissingField("name"))?;

        // The timestamp is display-only, an unparseable one is not worth dropping the entry
        let timestamp = record.timestamp.as_deref().and_then(|t| Timestamp::parse(t).ok());

        Ok(Self {
            id,
            name,
            role: record.role,
            last_message: record.last_message,
            timestamp,
            unread_count: record.unread_count.unwrap_or(0),
        })
    }
}

/// Displayed history of a single conversation, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the history with freshly loaded messages.
    ///
    /// Messages already present that the loaded set does not contain (live
    /// arrivals and optimistic entries recorded while loading) are kept and
    /// appended after the loaded ones.
    pub fn replace_with(&mut self, loaded: Vec<Message>) {
        let previous = std::mem::replace(&mut self.messages, loaded);
        for message in previous {
            self.append_if_absent(message);
        }
    }

    /// Append a message unless one with the same id is already present.
    ///
    /// Returns whether the message was appended.
    pub fn append_if_absent(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Remove a message by id
    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|m| &m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Whether a message with this id is present
    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
