//! UseCase layer error definitions.

use thiserror::Error;

use crate::domain::{StoreError, ValueObjectError};

/// Errors surfaced by the conversation views
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// User input or id failed validation
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValueObjectError),

    /// An operation needs an open conversation
    #[error("no conversation is open")]
    NoActiveRoom,

    /// Primary data operation failed (history fetch, send, list fetch)
    #[error(transparent)]
    Store(#[from] StoreError),
}
