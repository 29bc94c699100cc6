//! Message store port.
//!
//! The domain layer defines the trait; `infrastructure::repository` provides
//! the HTTP implementation. Use cases depend on the trait only.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{
    entity::{ChatUserRecord, Message},
    error::StoreError,
    value_object::{MessageContent, UserId},
};

/// Persistence of conversations, independent of the real-time channel.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Conversation summaries of the current principal, most recent first
    async fn get_chat_users(&self) -> Result<Vec<ChatUserRecord>, StoreError>;

    /// Full history with `other`, in the order returned by the server
    async fn get_messages(&self, other: &UserId) -> Result<Vec<Message>, StoreError>;

    /// Persist a new message and return the server's canonical copy
    async fn post_message(
        &self,
        receiver: &UserId,
        content: &MessageContent,
    ) -> Result<Message, StoreError>;

    /// Mark every message from `sender` to the current principal as read
    async fn mark_messages_as_read(&self, sender: &UserId) -> Result<(), StoreError>;
}
