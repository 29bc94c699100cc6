//! HTTP (reqwest) implementations.

mod chat;

pub use chat::HttpMessageStore;
