//! Domain layer error definitions.

use std::time::Duration;

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId validation error
    #[error("UserId cannot be empty")]
    UserIdEmpty,

    /// MessageId validation error
    #[error("MessageId cannot be empty")]
    MessageIdEmpty,

    /// MessageContent validation error
    #[error("MessageContent cannot be empty")]
    MessageContentEmpty,

    /// Timestamp is not a valid ISO-8601 string
    #[error("Timestamp must be an ISO-8601 string (got: {0})")]
    TimestampInvalid(String),
}

/// Errors raised when a wire record cannot become a domain entity
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    /// Required field is absent
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// Field is present but invalid
    #[error("invalid field `{field}`: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: ValueObjectError,
    },
}

/// Errors returned by the message store (HTTP layer)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Request never produced a response
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("server returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Errors returned by the real-time transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Handshake failed (`connect_error`)
    #[error("connection failed: {0}")]
    Connection(String),

    /// Handshake did not complete in time
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// Endpoint or request could not be built
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `disconnect_socket` was called while the handshake was pending
    #[error("connection attempt cancelled by disconnect")]
    Cancelled,
}
