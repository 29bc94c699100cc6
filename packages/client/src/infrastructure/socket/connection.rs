//! Transport connection manager.
//!
//! Owns at most one live WebSocket connection and provides room-scoped
//! pub/sub primitives on top of it. The manager is an explicit object owned
//! by the session scope and shared through `Arc`; nothing is global.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::{
    net::TcpStream,
    sync::{Mutex, Notify, mpsc, watch},
    task::AbortHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{
        Message as WsMessage,
        client::IntoClientRequest,
        http::{
            HeaderValue,
            header::{AUTHORIZATION, COOKIE},
        },
        protocol::CloseFrame,
    },
};

use crate::{
    domain::{
        ConnectionId, ConnectionStatus, ListenerId, Message, RealtimeTransport, RoomName,
        TransportError,
    },
    infrastructure::{
        dto::websocket::{ClientEvent, ServerEvent},
        session::Session,
    },
};

use super::listener::ListenerSlot;

/// Default handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Where and how to open the socket
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket endpoint (`ws://` or `wss://`)
    pub url: Url,
    /// HTTP origin whose cookies are sent with the upgrade request
    pub origin: Url,
    /// Handshake timeout
    pub connect_timeout: Duration,
}

impl SocketConfig {
    /// Derive the socket endpoint from the server's HTTP base URL.
    ///
    /// `http` maps to `ws` and `https` to `wss`; `path` replaces the path.
    pub fn for_server(server: &Url, path: &str) -> Result<Self, TransportError> {
        let scheme = match server.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(TransportError::Protocol(format!(
                    "unsupported server scheme '{}'",
                    other
                )));
            }
        };
        let mut url = server.clone();
        url.set_scheme(scheme)
            .map_err(|_| TransportError::Protocol(format!("cannot derive socket URL from {}", server)))?;
        url.set_path(path);
        url.set_query(None);

        Ok(Self {
            url,
            origin: server.clone(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Frames queued for the connection task
#[derive(Debug)]
enum Outbound {
    Event(ClientEvent),
    Close,
}

/// The managed connection
#[derive(Debug)]
struct SocketHandle {
    id: ConnectionId,
    outgoing: mpsc::UnboundedSender<Outbound>,
    task: AbortHandle,
}

impl SocketHandle {
    /// The connection task owns the receiver; once it ends the channel closes
    fn is_connected(&self) -> bool {
        !self.outgoing.is_closed()
    }
}

/// State shared between the manager and its connection task
#[derive(Debug)]
struct Shared {
    /// Serializes connection attempts; never held by emit or disconnect
    connect_gate: Mutex<()>,
    /// Locked only to read, install or clear the handle
    current: Mutex<Option<SocketHandle>>,
    /// Wakes a pending handshake when `disconnect_socket` is called
    cancel_connect: Notify,
    next_connection: AtomicU64,
    receive_message: ListenerSlot<Message>,
    conversation_update: ListenerSlot<()>,
    status: watch::Sender<ConnectionStatus>,
}

impl Shared {
    fn dispatch(&self, id: ConnectionId, text: &str) {
        match ServerEvent::parse(text) {
            Ok(ServerEvent::ReceiveMessage(dto)) => match Message::try_from(dto) {
                Ok(message) => {
                    tracing::debug!("Socket {} received message '{}'", id, message.id);
                    if !self.receive_message.emit(message) {
                        tracing::debug!("No receiveMessage listener registered, message dropped");
                    }
                }
                Err(e) => {
                    tracing::error!("Dropping malformed receiveMessage payload: {}", e);
                }
            },
            Ok(ServerEvent::ConversationUpdate) => {
                tracing::debug!("Socket {} received conversationUpdate", id);
                self.conversation_update.emit(());
            }
            Ok(ServerEvent::JoinedRoom(room)) => {
                tracing::debug!("Socket {} joined room '{}'", id, room);
            }
            Ok(ServerEvent::Unknown(event)) => {
                tracing::debug!("Socket {} ignoring unknown event '{}'", id, event);
            }
            Err(e) => {
                tracing::error!("Dropping unreadable frame on socket {}: {}", id, e);
            }
        }
    }

    /// Clear the reference to connection `id` once its task has ended
    async fn handle_disconnect(&self, id: ConnectionId, reason: &str) {
        let mut current = self.current.lock().await;
        if current.as_ref().map(|h| h.id) == Some(id) {
            current.take();
            self.status.send_replace(ConnectionStatus::Disconnected);
            tracing::info!("Socket {} disconnected: {}", id, reason);
        } else {
            tracing::debug!("Socket {} closed after being released: {}", id, reason);
        }
    }
}

/// Process-wide (per session) owner of the real-time connection
#[derive(Debug)]
pub struct ConnectionManager {
    config: SocketConfig,
    session: Arc<Session>,
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Create a manager; no connection is opened until [`connect_socket`] is called.
    ///
    /// [`connect_socket`]: RealtimeTransport::connect_socket
    pub fn new(config: SocketConfig, session: Arc<Session>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            config,
            session,
            shared: Arc::new(Shared {
                connect_gate: Mutex::new(()),
                current: Mutex::new(None),
                cancel_connect: Notify::new(),
                next_connection: AtomicU64::new(0),
                receive_message: ListenerSlot::new(),
                conversation_update: ListenerSlot::new(),
                status,
            }),
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Build the upgrade request carrying the session credentials
    fn build_request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, TransportError> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let headers = request.headers_mut();
        if let Some(authorization) = self.session.authorization_header() {
            let value = HeaderValue::from_str(&authorization)
                .map_err(|e| TransportError::Protocol(format!("invalid token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(cookie) = self.session.cookie_header(&self.config.origin) {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| TransportError::Protocol(format!("invalid cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }
        Ok(request)
    }

    /// Perform the handshake and spawn the connection task
    async fn open(&self, id: ConnectionId) -> Result<SocketHandle, TransportError> {
        let request = self.build_request()?;
        let timeout = self.config.connect_timeout;

        let (socket, _response) =
            match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request)).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(TransportError::Connection(e.to_string())),
                Err(_) => return Err(TransportError::Timeout(timeout)),
            };

        let (outgoing, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(id, socket, rx, self.shared.clone()));

        Ok(SocketHandle {
            id,
            outgoing,
            task: task.abort_handle(),
        })
    }

    /// Queue `event` on the current connection, or log and drop it
    async fn emit(&self, event: ClientEvent) {
        let current = self.shared.current.lock().await;
        match current.as_ref().filter(|h| h.is_connected()) {
            Some(handle) => {
                tracing::info!("Socket {} emitting {:?}", handle.id, event);
                if handle.outgoing.send(Outbound::Event(event)).is_err() {
                    tracing::warn!("Socket {} closed before the event was queued", handle.id);
                }
            }
            None => {
                tracing::warn!("Socket not connected, skipping {:?}", event);
            }
        }
    }
}

#[async_trait]
impl RealtimeTransport for ConnectionManager {
    async fn connect_socket(&self) -> Result<ConnectionId, TransportError> {
        // Concurrent callers queue here and share the winner's connection
        let _gate = self.shared.connect_gate.lock().await;

        {
            let mut current = self.shared.current.lock().await;
            if let Some(handle) = current.as_ref() {
                if handle.is_connected() {
                    return Ok(handle.id);
                }
                tracing::debug!("Socket {} is no longer connected, reconnecting", handle.id);
            }
            if let Some(stale) = current.take() {
                stale.task.abort();
            }
        }

        let id = ConnectionId::new(self.shared.next_connection.fetch_add(1, Ordering::Relaxed) + 1);
        self.shared.status.send_replace(ConnectionStatus::Connecting);
        tracing::debug!("Socket {} connecting to {}", id, self.config.url);

        let cancelled = self.shared.cancel_connect.notified();
        let result = tokio::select! {
            result = self.open(id) => result,
            _ = cancelled => Err(TransportError::Cancelled),
        };

        match result {
            Ok(handle) => {
                *self.shared.current.lock().await = Some(handle);
                self.shared.status.send_replace(ConnectionStatus::Connected);
                tracing::info!("Socket {} connected to {}", id, self.config.url);
                Ok(id)
            }
            Err(TransportError::Cancelled) => {
                tracing::info!("Socket {} connect cancelled by disconnect", id);
                Err(TransportError::Cancelled)
            }
            Err(e) => {
                self.shared.status.send_replace(ConnectionStatus::Disconnected);
                tracing::error!("Socket connect_error: {}", e);
                Err(e)
            }
        }
    }

    async fn disconnect_socket(&self) {
        self.shared.cancel_connect.notify_waiters();
        let handle = self.shared.current.lock().await.take();
        self.shared.status.send_replace(ConnectionStatus::Disconnected);
        match handle {
            Some(handle) => {
                if handle.outgoing.send(Outbound::Close).is_err() {
                    handle.task.abort();
                }
                tracing::info!("Socket {} disconnect requested", handle.id);
            }
            None => {
                tracing::debug!("disconnect_socket called while not connected");
            }
        }
    }

    async fn join_room(&self, room: &RoomName) {
        self.emit(ClientEvent::JoinRoom(room.to_string())).await;
    }

    async fn leave_room(&self, room: &RoomName) {
        self.emit(ClientEvent::LeaveRoom(room.to_string())).await;
    }

    fn on_receive_message(&self, listener: mpsc::UnboundedSender<Message>) -> ListenerId {
        self.shared.receive_message.replace(listener)
    }

    fn off_receive_message(&self, id: ListenerId) {
        if !self.shared.receive_message.clear(id) {
            tracing::debug!("receiveMessage listener {:?} was already replaced", id);
        }
    }

    fn on_conversation_update(&self, listener: mpsc::UnboundedSender<()>) -> ListenerId {
        self.shared.conversation_update.replace(listener)
    }

    fn off_conversation_update(&self, id: ListenerId) {
        if !self.shared.conversation_update.clear(id) {
            tracing::debug!("conversationUpdate listener {:?} was already replaced", id);
        }
    }

    fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Ok(mut current) = self.shared.current.try_lock()
            && let Some(handle) = current.take()
        {
            handle.task.abort();
        }
    }
}

/// Pump frames in both directions until either side closes.
///
/// Returns nothing; the disconnect reason is logged and the manager's
/// reference is cleared.
async fn run_connection(
    id: ConnectionId,
    socket: Socket,
    mut outgoing: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
) {
    let (mut sink, mut stream) = socket.split();

    let reason = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => shared.dispatch(id, text.as_str()),
                Some(Ok(WsMessage::Close(frame))) => break close_reason(frame),
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("transport error: {}", e),
                None => break "transport close".to_string(),
            },
            outbound = outgoing.recv() => match outbound {
                Some(Outbound::Event(event)) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to encode {:?}: {}", event, e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(WsMessage::Text(json.into())).await {
                        break format!("transport error: {}", e);
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = sink.send(WsMessage::Close(None)).await {
                        tracing::debug!("Socket {} close frame not sent: {}", id, e);
                    }
                    break "io client disconnect".to_string();
                }
            },
        }
    };

    drop(outgoing);
    shared.handle_disconnect(id, &reason).await;
}

fn close_reason(frame: Option<CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("io server disconnect ({})", frame.reason.as_str())
        }
        _ => "io server disconnect".to_string(),
    }
}
