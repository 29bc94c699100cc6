//! Infrastructure layer: HTTP and WebSocket adapters for the domain ports.

pub mod dto;
pub mod repository;
pub mod session;
pub mod socket;

pub use repository::HttpMessageStore;
pub use session::Session;
pub use socket::{ConnectionManager, SocketConfig};
