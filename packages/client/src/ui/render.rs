//! Terminal rendering of view state.

use std::collections::HashSet;

use advisor_chat_shared::time::to_jst_clock;

use crate::{
    domain::{ChatUser, Message, MessageId, RoomName, UserId},
    usecase::{ListViewState, RoomViewState},
};

pub const HELP: &str = "\
Commands:
  /contacts         list conversations
  /open <user-id>   open a conversation
  /close            leave the current conversation
  /reload           retry loading the current conversation
  /status           show connection status
  /help             show this help
  /quit             exit
Any other line is sent to the open conversation.";

pub fn format_message(message: &Message, me: &UserId, contact_name: Option<&str>) -> String {
    let author = if &message.sender_id == me {
        "you"
    } else {
        message
            .sender_name
            .as_deref()
            .or(contact_name)
            .unwrap_or(message.sender_id.as_str())
    };
    let pending = if message.is_optimistic() { " (sending)" } else { "" };
    format!(
        "[{}] {}: {}{}",
        to_jst_clock(&message.timestamp.value()),
        author,
        message.content,
        pending
    )
}

pub fn format_contact(contact: &ChatUser) -> String {
    let mut line = format!("{} ({})", contact.name, contact.id);
    if let Some(role) = &contact.role {
        line.push_str(&format!(" [{}]", role));
    }
    if contact.unread_count > 0 {
        line.push_str(&format!(" {} unread", contact.unread_count));
    }
    if let Some(preview) = &contact.last_message {
        line.push_str(&format!(" - {}", preview));
    }
    line
}

pub fn format_contacts(state: &ListViewState) -> Vec<String> {
    if let Some(error) = state.status.error() {
        return vec![format!("Could not load conversations: {}", error)];
    }
    if state.conversations.is_empty() {
        return vec!["No conversations yet.".to_string()];
    }
    state.conversations.iter().map(format_contact).collect()
}

/// Tracks what was already printed for the room view so updates print only new lines
#[derive(Debug, Default)]
pub struct RoomPrinter {
    room: Option<RoomName>,
    printed: HashSet<MessageId>,
    header_printed: bool,
    last_error: Option<String>,
    last_send_error: Option<String>,
}

impl RoomPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for the transition to `state`
    pub fn update(&mut self, state: &RoomViewState, me: &UserId) -> Vec<String> {
        let mut lines = Vec::new();

        if state.room != self.room {
            if let Some(old) = self.room.take() {
                lines.push(format!("-- left {} --", old));
            }
            self.room = state.room.clone();
            self.printed.clear();
            self.header_printed = false;
            self.last_error = None;
            self.last_send_error = None;
        }
        if self.room.is_none() {
            return lines;
        }

        if !self.header_printed && state.status.is_ready() {
            let name = state.contact_name.as_deref().unwrap_or("");
            lines.push(format!("-- conversation with {} --", name));
            self.header_printed = true;
        }

        let error = state.status.error().map(str::to_string);
        if error != self.last_error {
            if let Some(error) = &error {
                lines.push(format!("! could not load messages: {} (type /reload)", error));
            }
            self.last_error = error;
        }

        for message in &state.history {
            if self.printed.insert(message.id.clone()) {
                lines.push(format_message(message, me, state.contact_name.as_deref()));
            }
        }

        if state.send_error != self.last_send_error {
            if let Some(error) = &state.send_error {
                lines.push(format!("! message not sent: {}", error));
            }
            self.last_send_error = state.send_error.clone();
        }

        lines
    }
}
