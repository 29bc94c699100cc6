//! Data transfer objects for the HTTP API and the socket channel.

pub mod http;
pub mod websocket;
