//! Real-time socket transport (tokio-tungstenite).

mod connection;
pub mod listener;

pub use connection::{ConnectionManager, SocketConfig};
pub use listener::ListenerSlot;
