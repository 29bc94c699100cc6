//! HTTP API DTOs for the chat resource.

use serde::{Deserialize, Serialize};

use crate::domain::{
    MalformedRecord, Message, MessageContent, MessageId, Timestamp, UserId,
};

/// Message as found on the wire.
///
/// Every field is optional so that one malformed entry can be dropped
/// without failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>, // ISO 8601
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub sender_name: Option<String>,
}

impl TryFrom<MessageDto> for Message {
    type Error = MalformedRecord;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        let sender_id = required(dto.sender_id, "senderId")?;
        let receiver_id = required(dto.receiver_id, "receiverId")?;
        let id = required(dto.id, "id")?;
        let content = required(dto.content, "content")?;
        let timestamp = required(dto.timestamp, "timestamp")?;

        Ok(Self {
            id: MessageId::new(id).map_err(invalid("id"))?,
            sender_id: UserId::new(sender_id).map_err(invalid("senderId"))?,
            receiver_id: UserId::new(receiver_id).map_err(invalid("receiverId"))?,
            content: MessageContent::new(&content).map_err(invalid("content"))?,
            timestamp: Timestamp::parse(&timestamp).map_err(invalid("timestamp"))?,
            read: dto.read.unwrap_or(false),
            sender_name: dto.sender_name,
        })
    }
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: Some(message.id.to_string()),
            sender_id: Some(message.sender_id.to_string()),
            receiver_id: Some(message.receiver_id.to_string()),
            content: Some(message.content.to_string()),
            timestamp: Some(message.timestamp.to_string()),
            read: Some(message.read),
            sender_name: message.sender_name.clone(),
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MalformedRecord> {
    value.ok_or(MalformedRecord::MissingField(field))
}

fn invalid(
    field: &'static str,
) -> impl FnOnce(crate::domain::ValueObjectError) -> MalformedRecord {
    move |source| MalformedRecord::InvalidField { field, source }
}

/// Body of `POST /messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub receiver_id: String,
    pub content: String,
}

/// Body of `POST /messages/read`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub sender_id: String,
}
