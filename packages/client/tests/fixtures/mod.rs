//! Stub chat backend for integration tests.
//!
//! Serves the `/api/chat` resources and the `/socket` endpoint in-process on
//! an ephemeral port. The bearer token is taken as the signed-in user id.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use advisor_chat_client::infrastructure::{SocketConfig, Session};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::{Value, json};
use tokio::{sync::mpsc, task::JoinHandle};

/// Frames the stub pushes to one socket
#[derive(Debug)]
enum Outgoing {
    Text(String),
    Close,
}

struct SocketEntry {
    tx: mpsc::UnboundedSender<Outgoing>,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct StubState {
    contacts: Mutex<Vec<Value>>,
    messages: Mutex<Vec<Value>>,
    mark_read: Mutex<Vec<(String, String)>>,
    fail_next: Mutex<Option<u16>>,
    fail_history: Mutex<Option<u16>>,
    sockets: Mutex<HashMap<u64, SocketEntry>>,
    next_socket: AtomicU64,
    next_message: AtomicU64,
    accepted: AtomicUsize,
    socket_authorization: Mutex<Vec<Option<String>>>,
}

impl StubState {
    fn take_failure(&self) -> Option<Response> {
        let status = self.fail_next.lock().unwrap().take()?;
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Some((status, "stub failure").into_response())
    }

    fn send_to_room(&self, room: &str, text: &str) {
        for entry in self.sockets.lock().unwrap().values() {
            if entry.rooms.contains(room) {
                let _ = entry.tx.send(Outgoing::Text(text.to_string()));
            }
        }
    }

    fn send_to_all(&self, text: &str) {
        for entry in self.sockets.lock().unwrap().values() {
            let _ = entry.tx.send(Outgoing::Text(text.to_string()));
        }
    }
}

pub struct StubBackend {
    addr: SocketAddr,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubBackend {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/api/chat/contacts", get(contacts))
            .route("/api/chat/messages", post(post_message))
            .route("/api/chat/messages/read", post(mark_read))
            .route("/api/chat/messages/{user_id}", get(history))
            .route("/socket", get(socket_upgrade))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub backend");
        let addr = listener.local_addr().expect("Failed to read local address");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub backend failed");
        });

        Self { addr, state, task }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn api_base(&self) -> Url {
        self.base_url().join("/api/chat").unwrap()
    }

    pub fn socket_config(&self) -> SocketConfig {
        SocketConfig::for_server(&self.base_url(), "/socket")
            .unwrap()
            .with_connect_timeout(Duration::from_secs(2))
    }

    /// Session signed in as `user`
    pub fn session_for(&self, user: &str) -> Arc<Session> {
        Arc::new(Session::with_token(Some(user.to_string())))
    }

    pub fn seed_contacts(&self, contacts: Vec<Value>) {
        *self.state.contacts.lock().unwrap() = contacts;
    }

    pub fn seed_message(&self, message: Value) {
        self.state.messages.lock().unwrap().push(message);
    }

    /// Make the next HTTP request answer with `status`
    pub fn fail_next(&self, status: u16) {
        *self.state.fail_next.lock().unwrap() = Some(status);
    }

    /// Make the next history request answer with `status`
    pub fn fail_next_history(&self, status: u16) {
        *self.state.fail_history.lock().unwrap() = Some(status);
    }

    pub fn mark_read_calls(&self) -> Vec<(String, String)> {
        self.state.mark_read.lock().unwrap().clone()
    }

    /// Socket upgrades accepted so far
    pub fn accepted_connections(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    pub fn live_sockets(&self) -> usize {
        self.state.sockets.lock().unwrap().len()
    }

    /// Wait until the server side has registered `count` sockets
    pub async fn wait_for_sockets(&self, count: usize) {
        eventually(|| self.live_sockets() == count).await;
    }

    pub fn socket_authorization(&self) -> Vec<Option<String>> {
        self.state.socket_authorization.lock().unwrap().clone()
    }

    /// Sockets currently joined to `room`
    pub fn room_members(&self, room: &str) -> usize {
        self.state
            .sockets
            .lock()
            .unwrap()
            .values()
            .filter(|entry| entry.rooms.contains(room))
            .count()
    }

    /// Push a raw text frame to every socket
    pub fn push_raw(&self, text: &str) {
        self.state.send_to_all(text);
    }

    /// Push `receiveMessage` to every socket, regardless of room
    pub fn push_message(&self, message: Value) {
        self.push_raw(&json!({ "event": "receiveMessage", "data": message }).to_string());
    }

    pub fn push_conversation_update(&self) {
        self.push_raw(&json!({ "event": "conversationUpdate" }).to_string());
    }

    /// Server-initiated close of every socket
    pub fn drop_connections(&self) {
        for entry in self.state.sockets.lock().unwrap().values() {
            let _ = entry.tx.send(Outgoing::Close);
        }
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A server-side message payload
pub fn message_json(id: &str, from: &str, to: &str, content: &str) -> Value {
    json!({
        "id": id,
        "senderId": from,
        "receiverId": to,
        "content": content,
        "timestamp": "2024-05-01T10:00:00.000Z",
        "read": false,
    })
}

pub fn contact_json(id: &str, name: &str, unread: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "role": "advisor",
        "lastMessage": "See you",
        "timestamp": "2024-05-01T10:00:00.000Z",
        "unreadCount": unread,
    })
}

pub fn room_of(a: &str, b: &str) -> String {
    let mut pair = [a, b];
    pair.sort();
    pair.join("-")
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(3), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

fn principal(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn contacts(State(state): State<Arc<StubState>>) -> Response {
    if let Some(failure) = state.take_failure() {
        return failure;
    }
    Json(state.contacts.lock().unwrap().clone()).into_response()
}

async fn history(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    if let Some(failure) = state.take_failure() {
        return failure;
    }
    if let Some(status) = state.fail_history.lock().unwrap().take() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "history unavailable").into_response();
    }
    let Some(me) = principal(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let room = room_of(&me, &user_id);
    let messages: Vec<Value> = state
        .messages
        .lock()
        .unwrap()
        .iter()
        .filter(|m| {
            let from = m["senderId"].as_str().unwrap_or_default();
            let to = m["receiverId"].as_str().unwrap_or_default();
            room_of(from, to) == room
        })
        .cloned()
        .collect();
    Json(messages).into_response()
}

async fn post_message(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = state.take_failure() {
        return failure;
    }
    let Some(me) = principal(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let receiver = body["receiverId"].as_str().unwrap_or_default().to_string();
    let content = body["content"].as_str().unwrap_or_default().to_string();
    if receiver.is_empty() || content.is_empty() {
        return (StatusCode::BAD_REQUEST, "receiverId and content are required").into_response();
    }

    let id = format!("srv-{}", state.next_message.fetch_add(1, Ordering::SeqCst) + 1);
    let message = message_json(&id, &me, &receiver, &content);
    state.messages.lock().unwrap().push(message.clone());

    let event = json!({ "event": "receiveMessage", "data": message }).to_string();
    state.send_to_room(&room_of(&me, &receiver), &event);
    state.send_to_all(&json!({ "event": "conversationUpdate" }).to_string());

    (StatusCode::CREATED, Json(message)).into_response()
}

async fn mark_read(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = state.take_failure() {
        return failure;
    }
    let me = principal(&headers).unwrap_or_default();
    let sender = body["senderId"].as_str().unwrap_or_default().to_string();
    state.mark_read.lock().unwrap().push((me, sender));
    Json(json!({ "success": true })).into_response()
}

async fn socket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.socket_authorization.lock().unwrap().push(authorization);
    state.accepted.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<StubState>) {
    let id = state.next_socket.fetch_add(1, Ordering::SeqCst);
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.sockets.lock().unwrap().insert(
        id,
        SocketEntry {
            tx: tx.clone(),
            rooms: HashSet::new(),
        },
    );

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    let Ok(envelope) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let room = envelope["data"].as_str().unwrap_or_default().to_string();
                    match envelope["event"].as_str() {
                        Some("joinRoom") => {
                            if let Some(entry) = state.sockets.lock().unwrap().get_mut(&id) {
                                entry.rooms.insert(room.clone());
                            }
                            let ack = json!({ "event": "joinedRoom", "data": room }).to_string();
                            let _ = tx.send(Outgoing::Text(ack));
                        }
                        Some("leaveRoom") => {
                            if let Some(entry) = state.sockets.lock().unwrap().get_mut(&id) {
                                entry.rooms.remove(&room);
                            }
                        }
                        _ => {}
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            outgoing = rx.recv() => match outgoing {
                Some(Outgoing::Text(text)) => {
                    if sender.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    let _ = sender.send(WsMessage::Close(None)).await;
                    break;
                }
            },
        }
    }

    state.sockets.lock().unwrap().remove(&id);
}
