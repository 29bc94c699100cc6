//! Credentials shared by the HTTP store and the socket connection.
//!
//! The session cookie lives in a `reqwest` cookie jar; the bearer token is
//! whatever the authentication layer stored locally, if anything.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{
    Url,
    cookie::{CookieStore, Jar},
};

/// Session state for one signed-in principal
#[derive(Debug, Default)]
pub struct Session {
    jar: Arc<Jar>,
    token: RwLock<Option<String>>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session holding a stored token
    pub fn with_token(token: Option<String>) -> Self {
        Self {
            jar: Arc::new(Jar::default()),
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    /// Cookie jar to install in the HTTP client
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Store a `Set-Cookie` style value for `url`
    pub fn add_cookie(&self, cookie: &str, url: &Url) {
        self.jar.add_cookie_str(cookie, url);
    }

    /// Replace the stored token
    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *guard = token.filter(|t| !t.is_empty());
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `Authorization` header value, when a token is stored
    pub fn authorization_header(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {}", token))
    }

    /// `Cookie` header value for `url`, when the jar holds matching cookies
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }
}
