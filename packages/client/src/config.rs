//! Command-line and environment configuration for the terminal client.

use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use thiserror::Error;

use crate::{
    domain::{UserId, ValueObjectError},
    infrastructure::SocketConfig,
};

/// Path segments of the chat REST resources, appended to the server URL's path
pub const API_PATH: [&str; 2] = ["api", "chat"];

#[derive(Debug, Clone, Parser)]
#[command(name = "advisor-chat", version, about = "Terminal chat client for the advisory platform")]
pub struct Args {
    /// Base URL of the platform server
    #[arg(long, env = "ADVISOR_CHAT_SERVER_URL", default_value = "http://localhost:5000")]
    pub server_url: String,

    /// Path of the real-time endpoint
    #[arg(long, env = "ADVISOR_CHAT_SOCKET_PATH", default_value = "/socket")]
    pub socket_path: String,

    /// Signed-in user id
    #[arg(long, env = "ADVISOR_CHAT_USER_ID")]
    pub user_id: String,

    /// Bearer token stored by the authentication layer
    #[arg(long, env = "ADVISOR_CHAT_TOKEN")]
    pub token: Option<String>,

    /// Seconds to wait for the socket handshake
    #[arg(long, env = "ADVISOR_CHAT_CONNECT_TIMEOUT", default_value_t = 20)]
    pub connect_timeout_secs: u64,

    /// Log level for the client crates
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] ValueObjectError),

    #[error("connect timeout must be greater than zero")]
    ZeroConnectTimeout,
}

/// Validated client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: Url,
    /// `{server}/api/chat`, keeping any path prefix of the server URL
    pub api_base: Url,
    pub socket: SocketConfig,
    pub user_id: UserId,
    pub token: Option<String>,
}

impl ClientConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidServerUrl {
            url: args.server_url.clone(),
            reason,
        };

        let server_url = Url::parse(&args.server_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", server_url.scheme())));
        }
        if args.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroConnectTimeout);
        }

        let mut api_base = server_url.clone();
        api_base.set_query(None);
        api_base.set_fragment(None);
        api_base
            .path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(API_PATH);
        let socket = SocketConfig::for_server(&server_url, &args.socket_path)
            .map_err(|e| invalid(e.to_string()))?
            .with_connect_timeout(Duration::from_secs(args.connect_timeout_secs));
        let user_id = UserId::new(args.user_id.clone())?;

        Ok(Self {
            server_url,
            api_base,
            socket,
            user_id,
            token: args.token.clone().filter(|t| !t.is_empty()),
        })
    }
}
