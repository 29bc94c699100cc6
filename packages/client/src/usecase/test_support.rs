//! Test doubles for the use case tests.

use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::{
    domain::{
        ConnectionId, ConnectionStatus, ListenerId, Message, MessageContent, MessageId,
        RealtimeTransport, RoomName, Timestamp, TransportError, UserId,
    },
    infrastructure::socket::ListenerSlot,
};

/// In-memory transport that records calls and lets tests push events
pub struct FakeTransport {
    calls: Mutex<Vec<String>>,
    connected: AtomicBool,
    fail_connect: AtomicBool,
    next_connection: AtomicU64,
    receive_message: ListenerSlot<Message>,
    conversation_update: ListenerSlot<()>,
    status: watch::Sender<ConnectionStatus>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            next_connection: AtomicU64::new(0),
            receive_message: ListenerSlot::new(),
            conversation_update: ListenerSlot::new(),
            status,
        }
    }

    /// Make every `connect_socket` call fail
    pub fn failing() -> Self {
        let transport = Self::new();
        transport.fail_connect.store(true, Ordering::SeqCst);
        transport
    }

    /// Recorded calls, e.g. `["connect", "join:a1-b2"]`
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn push_message(&self, message: Message) -> bool {
        self.receive_message.emit(message)
    }

    pub fn push_conversation_update(&self) -> bool {
        self.conversation_update.emit(())
    }

    pub fn has_receive_listener(&self) -> bool {
        self.receive_message.is_registered()
    }

    pub fn has_update_listener(&self) -> bool {
        self.conversation_update.is_registered()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl RealtimeTransport for FakeTransport {
    async fn connect_socket(&self) -> Result<ConnectionId, TransportError> {
        self.record("connect".to_string());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("refused".to_string()));
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.next_connection.fetch_add(1, Ordering::SeqCst);
        }
        self.status.send_replace(ConnectionStatus::Connected);
        Ok(ConnectionId::new(self.next_connection.load(Ordering::SeqCst)))
    }

    async fn disconnect_socket(&self) {
        self.record("disconnect".to_string());
        self.connected.store(false, Ordering::SeqCst);
        self.status.send_replace(ConnectionStatus::Disconnected);
    }

    async fn join_room(&self, room: &RoomName) {
        self.record(format!("join:{}", room));
    }

    async fn leave_room(&self, room: &RoomName) {
        self.record(format!("leave:{}", room));
    }

    fn on_receive_message(&self, listener: mpsc::UnboundedSender<Message>) -> ListenerId {
        self.receive_message.replace(listener)
    }

    fn off_receive_message(&self, id: ListenerId) {
        self.receive_message.clear(id);
    }

    fn on_conversation_update(&self, listener: mpsc::UnboundedSender<()>) -> ListenerId {
        self.conversation_update.replace(listener)
    }

    fn off_conversation_update(&self, id: ListenerId) {
        self.conversation_update.clear(id);
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

/// A server-confirmed message
pub fn server_message(id: &str, from: &str, to: &str, content: &str) -> Message {
    Message {
        id: MessageId::new(id.to_string()).unwrap(),
        sender_id: user(from),
        receiver_id: user(to),
        content: MessageContent::new(content).unwrap(),
        timestamp: Timestamp::parse("2024-05-01T10:00:00.000Z").unwrap(),
        read: false,
        sender_name: None,
    }
}

/// Wait until `condition` holds for the watched state
pub async fn wait_for_state<T>(rx: &mut watch::Receiver<T>, condition: impl FnMut(&T) -> bool) {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(condition))
        .await
        .expect("timed out waiting for state")
        .expect("state sender dropped");
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
