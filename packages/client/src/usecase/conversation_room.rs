//! UseCase: 会話ルーム
//!
//! 1 対 1 の会話の履歴表示・送信・ライブ受信を管理する状態機械。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - `ConversationRoom::open()` / `send()` / `close()` と受信リスナーの処理
//!
//! ### なぜこのテストが必要か
//! - ソケットはプロセス全体で 1 本を共有するため、ルーム名による受信フィルタが唯一の隔離手段
//! - 楽観的更新の取り消しとサーバーエコーの重複排除が表示の正しさを決める
//!
//! ### どのような状況を想定しているか
//! - 正常系：履歴読み込み、送信、ライブ受信
//! - 異常系：履歴取得失敗、送信失敗（ロールバック）、ソケット接続失敗
//! - エッジケース：別ルームのメッセージ、同じ ID の二重配送、ルーム切り替え

use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::domain::{
    ConversationHistory, FALLBACK_CONTACT_NAME, ListenerId, Message, MessageContent,
    MessageStore, RealtimeTransport, RoomName, UserId,
};

use super::{error::ConversationError, state::ViewStatus};

/// Everything a consumer needs to render a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomViewState {
    pub status: ViewStatus,
    pub other_user: Option<UserId>,
    /// Display name of the other participant, resolved best-effort
    pub contact_name: Option<String>,
    pub room: Option<RoomName>,
    pub history: ConversationHistory,
    /// Optimistic sends waiting for the HTTP response
    pub pending_sends: usize,
    /// Last send failure, cleared by the next send
    pub send_error: Option<String>,
}

impl RoomViewState {
    pub fn is_sending(&self) -> bool {
        self.pending_sends > 0
    }
}

/// The room this view is joined to
struct ActiveRoom {
    room: RoomName,
    other_user: UserId,
    listener: ListenerId,
    pump: JoinHandle<()>,
}

/// Conversation Room View keyed by `(current_user, other_user)`
pub struct ConversationRoom {
    current_user: UserId,
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn RealtimeTransport>,
    state: Arc<watch::Sender<RoomViewState>>,
    active: Option<ActiveRoom>,
}

impl ConversationRoom {
    /// 新しい ConversationRoom を作成
    pub fn new(
        current_user: UserId,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Self {
        let (state, _) = watch::channel(RoomViewState::default());
        Self {
            current_user,
            store,
            transport,
            state: Arc::new(state),
            active: None,
        }
    }

    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    /// Room currently joined, if any
    pub fn room(&self) -> Option<&RoomName> {
        self.active.as_ref().map(|a| &a.room)
    }

    /// Snapshot of the view state
    pub fn state(&self) -> RoomViewState {
        self.state.borrow().clone()
    }

    /// Watch the view state
    pub fn subscribe(&self) -> watch::Receiver<RoomViewState> {
        self.state.subscribe()
    }

    /// Mount the view for a conversation with `other`.
    ///
    /// Any previously open room is closed first. History, the contact name and
    /// the socket subscription are set up concurrently; the view becomes
    /// `Ready` once history is loaded, or `Error` if that fails.
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::Store` if the history fetch fails. The room
    /// stays joined so live messages keep arriving until [`close`](Self::close).
    pub async fn open(&mut self, other: UserId) -> Result<(), ConversationError> {
        if self.active.is_some() {
            self.close().await;
        }

        let room = RoomName::for_participants(&self.current_user, &other);
        tracing::info!("Opening conversation with '{}' in room '{}'", other, room);

        self.state.send_replace(RoomViewState {
            status: ViewStatus::Loading,
            other_user: Some(other.clone()),
            room: Some(room.clone()),
            ..Default::default()
        });

        let (listener_tx, listener_rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump_messages(
            listener_rx,
            ReceiveContext {
                current_user: self.current_user.clone(),
                room: room.clone(),
                state: self.state.clone(),
                store: self.store.clone(),
            },
        ));

        spawn_mark_read(self.store.clone(), other.clone());

        let subscribe = async {
            if let Err(e) = self.transport.connect_socket().await {
                tracing::warn!("Realtime channel unavailable for room '{}': {}", room, e);
            }
            self.transport.join_room(&room).await;
            self.transport.on_receive_message(listener_tx)
        };

        let (history, contact_name, listener) = tokio::join!(
            self.store.get_messages(&other),
            resolve_contact_name(self.store.as_ref(), &other),
            subscribe,
        );

        self.active = Some(ActiveRoom {
            room: room.clone(),
            other_user: other.clone(),
            listener,
            pump,
        });

        match history {
            Ok(messages) => {
                tracing::debug!("Loaded {} messages for room '{}'", messages.len(), room);
                self.state.send_modify(|s| {
                    s.history.replace_with(messages);
                    s.contact_name = Some(contact_name);
                    s.status = ViewStatus::Ready;
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load history with '{}': {}", other, e);
                self.state.send_modify(|s| {
                    s.contact_name = Some(contact_name);
                    s.status = ViewStatus::Error(e.to_string());
                });
                Err(e.into())
            }
        }
    }

    /// Retry loading the current conversation
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::NoActiveRoom` if nothing was opened, or the
    /// error of the new [`open`](Self::open) attempt
    pub async fn reload(&mut self) -> Result<(), ConversationError> {
        let other = self
            .active
            .as_ref()
            .map(|a| a.other_user.clone())
            .ok_or(ConversationError::NoActiveRoom)?;
        self.open(other).await
    }

    /// Send `input` to the open conversation.
    ///
    /// An optimistic entry with a temporary id is shown immediately. On
    /// success nothing else changes locally: the server's broadcast echo is
    /// merged by id through the receive path, so the temporary row and the
    /// confirmed row both remain. On failure the optimistic entry is removed.
    ///
    /// # Errors
    ///
    /// - `ConversationError::InvalidInput` if `input` is blank
    /// - `ConversationError::NoActiveRoom` if no conversation is open
    /// - `ConversationError::Store` if the message could not be persisted
    pub async fn send(&self, input: &str) -> Result<Message, ConversationError> {
        let content = MessageContent::new(input)?;
        let other = self
            .active
            .as_ref()
            .map(|a| a.other_user.clone())
            .ok_or(ConversationError::NoActiveRoom)?;

        let optimistic = Message::optimistic(self.current_user.clone(), other.clone(), content.clone());
        let temp_id = optimistic.id.clone();
        self.state.send_modify(|s| {
            s.history.append_if_absent(optimistic);
            s.pending_sends += 1;
            s.send_error = None;
        });

        match self.store.post_message(&other, &content).await {
            Ok(message) => {
                tracing::info!("Message '{}' sent to '{}'", message.id, other);
                self.state
                    .send_modify(|s| s.pending_sends = s.pending_sends.saturating_sub(1));
                Ok(message)
            }
            Err(e) => {
                tracing::error!("Failed to send message to '{}': {}", other, e);
                self.state.send_modify(|s| {
                    s.history.remove(&temp_id);
                    s.pending_sends = s.pending_sends.saturating_sub(1);
                    s.send_error = Some(e.to_string());
                });
                Err(e.into())
            }
        }
    }

    /// Unmount: leave the room, then remove the receive listener.
    ///
    /// Must complete before another room is joined.
    pub async fn close(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        tracing::info!("Closing room '{}'", active.room);

        self.transport.leave_room(&active.room).await;
        self.transport.off_receive_message(active.listener);
        active.pump.abort();

        self.state.send_replace(RoomViewState::default());
    }
}

impl Drop for ConversationRoom {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::warn!("Room '{}' dropped without close; listener removed", active.room);
            self.transport.off_receive_message(active.listener);
            active.pump.abort();
        }
    }
}

/// What the receive listener needs, detached from the view
struct ReceiveContext {
    current_user: UserId,
    room: RoomName,
    state: Arc<watch::Sender<RoomViewState>>,
    store: Arc<dyn MessageStore>,
}

impl ReceiveContext {
    /// Apply one inbound message. Returns whether it was appended.
    fn handle_incoming(&self, message: Message) -> bool {
        let message_room = message.room();
        if message_room != self.room {
            tracing::debug!(
                "Discarding message '{}' for room '{}' while in '{}'",
                message.id,
                message_room,
                self.room
            );
            return false;
        }

        let mark_read_for = (message.receiver_id == self.current_user).then(|| message.sender_id.clone());

        let appended = self.state.send_if_modified(|s| {
            // The view may have moved on while this message was in flight
            if s.room.as_ref() != Some(&self.room) {
                return false;
            }
            s.history.append_if_absent(message)
        });

        if let Some(sender) = mark_read_for {
            spawn_mark_read(self.store.clone(), sender);
        }
        appended
    }
}

async fn pump_messages(mut rx: mpsc::UnboundedReceiver<Message>, ctx: ReceiveContext) {
    while let Some(message) = rx.recv().await {
        ctx.handle_incoming(message);
    }
    tracing::debug!("Receive listener for room '{}' released", ctx.room);
}

/// Best-effort lookup of the contact's display name
async fn resolve_contact_name(store: &dyn MessageStore, other: &UserId) -> String {
    match store.get_chat_users().await {
        Ok(records) => records
            .into_iter()
            .find(|r| r.id.as_deref() == Some(other.as_str()))
            .and_then(|r| r.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_CONTACT_NAME.to_string()),
        Err(e) => {
            tracing::warn!("Could not resolve contact name for '{}': {}", other, e);
            FALLBACK_CONTACT_NAME.to_string()
        }
    }
}

/// Fire-and-forget read receipt; failures are logged only
fn spawn_mark_read(store: Arc<dyn MessageStore>, sender: UserId) {
    tokio::spawn(async move {
        if let Err(e) = store.mark_messages_as_read(&sender).await {
            tracing::warn!("Failed to mark messages from '{}' as read: {}", sender, e);
        }
    });
}
