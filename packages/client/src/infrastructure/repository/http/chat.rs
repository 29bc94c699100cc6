//! HTTP Message Store 実装
//!
//! `/api/chat` リソースに対して会話の取得・送信・既読化を行います。
//! ソケットの接続状態とは独立して動作します。

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    domain::{ChatUserRecord, Message, MessageContent, MessageStore, StoreError, UserId},
    infrastructure::{
        dto::http::{MarkReadRequest, MessageDto, PostMessageRequest},
        session::Session,
    },
};

/// reqwest-backed implementation of [`MessageStore`]
#[derive(Debug, Clone)]
pub struct HttpMessageStore {
    client: reqwest::Client,
    /// Base of the chat resource, e.g. `http://localhost:5000/api/chat`
    api_base: Url,
    session: Arc<Session>,
}

impl HttpMessageStore {
    /// Create a store for the chat resource at `api_base`.
    ///
    /// The HTTP client shares the session's cookie jar.
    pub fn new(api_base: Url, session: Arc<Session>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .cookie_provider(session.cookie_jar())
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_base,
            session,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Resolve `segments` below the API base, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Network(format!("invalid API base: {}", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.session.authorization_header() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, StoreError> {
        self.execute(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Fetch a JSON array, decoding each element on its own.
    ///
    /// Elements that fail to decode are logged and dropped; only a body
    /// that is not an array fails the call.
    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self.fetch_json(builder).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<T>(row) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!("Dropping undecodable {}: {}", what, e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn get_chat_users(&self) -> Result<Vec<ChatUserRecord>, StoreError> {
        let url = self.endpoint(&["contacts"])?;
        tracing::debug!("GET {}", url);
        self.fetch_rows(self.request(Method::GET, url), "contact")
            .await
    }

    async fn get_messages(&self, other: &UserId) -> Result<Vec<Message>, StoreError> {
        let url = self.endpoint(&["messages", other.as_str()])?;
        tracing::debug!("GET {}", url);
        let dtos: Vec<MessageDto> = self
            .fetch_rows(self.request(Method::GET, url), "history row")
            .await?;

        let messages = dtos
            .into_iter()
            .filter_map(|dto| match Message::try_from(dto) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!("Dropping malformed message in history with '{}': {}", other, e);
                    None
                }
            })
            .collect();
        Ok(messages)
    }

    async fn post_message(
        &self,
        receiver: &UserId,
        content: &MessageContent,
    ) -> Result<Message, StoreError> {
        let url = self.endpoint(&["messages"])?;
        tracing::debug!("POST {}", url);
        let body = PostMessageRequest {
            receiver_id: receiver.to_string(),
            content: content.to_string(),
        };
        let dto: MessageDto = self
            .fetch_json(self.request(Method::POST, url).json(&body))
            .await?;
        Message::try_from(dto).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn mark_messages_as_read(&self, sender: &UserId) -> Result<(), StoreError> {
        let url = self.endpoint(&["messages", "read"])?;
        tracing::debug!("POST {}", url);
        let body = MarkReadRequest {
            sender_id: sender.to_string(),
        };
        self.execute(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(())
    }
}
