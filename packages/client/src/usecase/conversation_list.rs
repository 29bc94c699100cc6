//! UseCase: 会話一覧
//!
//! ログイン中のユーザーの会話サマリ一覧を表示し、`conversationUpdate`
//! 通知のたびにサーバーから再取得する。

use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::domain::{ChatUser, ListenerId, MessageStore, RealtimeTransport, UserId};

use super::{error::ConversationError, state::ViewStatus};

/// Conversation summaries as the server computed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListViewState {
    pub status: ViewStatus,
    pub principal: Option<UserId>,
    pub conversations: Vec<ChatUser>,
}

impl ListViewState {
    /// Sum of unread counts across conversations
    pub fn total_unread(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }
}

struct Subscription {
    listener: ListenerId,
    pump: JoinHandle<()>,
}

/// Conversation List View
pub struct ConversationList {
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn RealtimeTransport>,
    state: Arc<watch::Sender<ListViewState>>,
    subscription: Option<Subscription>,
}

impl ConversationList {
    pub fn new(store: Arc<dyn MessageStore>, transport: Arc<dyn RealtimeTransport>) -> Self {
        let (state, _) = watch::channel(ListViewState::default());
        Self {
            store,
            transport,
            state: Arc::new(state),
            subscription: None,
        }
    }

    pub fn state(&self) -> ListViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListViewState> {
        self.state.subscribe()
    }

    /// Mount the list for `principal`.
    ///
    /// Connects (best-effort), registers the update listener once and performs
    /// the initial fetch.
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::Store` if the initial fetch fails; the
    /// listener stays registered so a later notification can recover.
    pub async fn mount(&mut self, principal: UserId) -> Result<(), ConversationError> {
        tracing::info!("Mounting conversation list for '{}'", principal);
        self.state.send_modify(|s| {
            s.principal = Some(principal);
            s.status = ViewStatus::Loading;
        });

        if let Err(e) = self.transport.connect_socket().await {
            tracing::warn!("Realtime channel unavailable for conversation list: {}", e);
        }

        if self.subscription.is_none() {
            let (tx, rx) = mpsc::unbounded_channel();
            let listener = self.transport.on_conversation_update(tx);
            let pump = tokio::spawn(pump_updates(rx, self.store.clone(), self.state.clone()));
            self.subscription = Some(Subscription { listener, pump });
        }

        self.refresh().await
    }

    /// Switch to another principal, re-fetching only when it changed
    ///
    /// # Errors
    ///
    /// Returns the error of the re-fetch, if one happened
    pub async fn set_principal(&mut self, principal: UserId) -> Result<(), ConversationError> {
        let changed = self.state.send_if_modified(|s| {
            if s.principal.as_ref() == Some(&principal) {
                return false;
            }
            s.principal = Some(principal);
            true
        });
        if !changed {
            return Ok(());
        }
        self.refresh().await
    }

    /// Re-fetch the conversation summaries
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::Store` if the fetch fails
    pub async fn refresh(&self) -> Result<(), ConversationError> {
        fetch_into(self.store.as_ref(), &self.state).await
    }

    /// Unregister the update listener and reset the view
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.transport.off_conversation_update(subscription.listener);
            subscription.pump.abort();
        }
        self.state.send_replace(ListViewState::default());
    }
}

impl Drop for ConversationList {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.transport.off_conversation_update(subscription.listener);
            subscription.pump.abort();
        }
    }
}

async fn pump_updates(
    mut rx: mpsc::UnboundedReceiver<()>,
    store: Arc<dyn MessageStore>,
    state: Arc<watch::Sender<ListViewState>>,
) {
    while rx.recv().await.is_some() {
        tracing::debug!("Conversation update received, refreshing list");
        if let Err(e) = fetch_into(store.as_ref(), &state).await {
            tracing::warn!("Conversation list refresh failed: {}", e);
        }
    }
}

async fn fetch_into(
    store: &dyn MessageStore,
    state: &watch::Sender<ListViewState>,
) -> Result<(), ConversationError> {
    match store.get_chat_users().await {
        Ok(records) => {
            let conversations: Vec<ChatUser> = records
                .into_iter()
                .filter_map(|record| match ChatUser::try_from(record) {
                    Ok(user) => Some(user),
                    Err(e) => {
                        tracing::warn!("Dropping malformed conversation summary: {}", e);
                        None
                    }
                })
                .collect();
            tracing::debug!("Loaded {} conversations", conversations.len());
            state.send_modify(|s| {
                s.conversations = conversations;
                s.status = ViewStatus::Ready;
            });
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to load conversations: {}", e);
            state.send_modify(|s| s.status = ViewStatus::Error(e.to_string()));
            Err(e.into())
        }
    }
}
