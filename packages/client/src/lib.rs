//! Real-time conversation client for Advisor Chat.
//!
//! Layers follow the server side of the platform: `domain` holds the chat
//! model and ports, `infrastructure` the HTTP and WebSocket adapters,
//! `usecase` the conversation view state machines and `ui` the terminal
//! client.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub use config::{Args, ClientConfig, ConfigError};
pub use ui::run_client;
