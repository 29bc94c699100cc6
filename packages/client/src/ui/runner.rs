//! Terminal client runner.

use std::sync::Arc;

use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    config::ClientConfig,
    domain::{MessageStore, RealtimeTransport, StoreError, UserId},
    infrastructure::{ConnectionManager, HttpMessageStore, Session},
    usecase::{ConversationError, ConversationList, ConversationRoom},
};

use super::{
    command::Command,
    render::{HELP, RoomPrinter, format_contacts},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to set up the message store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to start the line editor: {0}")]
    Readline(#[from] ReadlineError),
}

/// Run the interactive client until the user quits
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    tracing::info!(
        "Starting client for '{}' against {}",
        config.user_id,
        config.server_url
    );

    let session = Arc::new(Session::with_token(config.token.clone()));
    let store: Arc<dyn MessageStore> =
        Arc::new(HttpMessageStore::new(config.api_base.clone(), session.clone())?);
    let transport = Arc::new(ConnectionManager::new(config.socket.clone(), session));
    let realtime: Arc<dyn RealtimeTransport> = transport.clone();

    let me = config.user_id.clone();
    let mut list = ConversationList::new(store.clone(), realtime.clone());
    let mut room = ConversationRoom::new(me.clone(), store, realtime.clone());

    let renderers = [
        spawn_room_renderer(&room, me.clone()),
        spawn_status_renderer(realtime.as_ref()),
    ];

    let mut lines = spawn_line_reader().await?;

    println!("Signed in as {}. Type /help for commands.", me);
    if let Err(e) = list.mount(me.clone()).await {
        println!("Could not load conversations: {}", e);
    } else {
        print_lines(format_contacts(&list.state()));
    }

    while let Some(line) = lines.recv().await {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Status => println!("Connection: {}", realtime.status()),
            Command::Contacts => {
                if let Err(e) = list.refresh().await {
                    tracing::debug!("Contact refresh failed: {}", e);
                }
                print_lines(format_contacts(&list.state()));
            }
            Command::Open(other) => match UserId::new(other) {
                Ok(other) if other == me => println!("You cannot open a conversation with yourself."),
                Ok(other) => {
                    if let Err(e) = room.open(other).await {
                        tracing::debug!("Open failed: {}", e);
                    }
                }
                Err(e) => println!("{}", e),
            },
            Command::Close => room.close().await,
            Command::Reload => {
                if let Err(e) = room.reload().await {
                    println!("{}", e);
                }
            }
            Command::Send(text) => {
                // Store failures are shown by the room renderer
                if let Err(e) = room.send(&text).await
                    && !matches!(e, ConversationError::Store(_))
                {
                    println!("{}", e);
                }
            }
        }
    }

    tracing::info!("Shutting down client");
    room.close().await;
    list.unmount();
    transport.disconnect_socket().await;
    for renderer in renderers {
        renderer.abort();
    }
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn spawn_room_renderer(room: &ConversationRoom, me: UserId) -> JoinHandle<()> {
    let mut rx = room.subscribe();
    tokio::spawn(async move {
        let mut printer = RoomPrinter::new();
        loop {
            let lines = {
                let state = rx.borrow_and_update();
                printer.update(&state, &me)
            };
            print_lines(lines);
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

fn spawn_status_renderer(transport: &dyn RealtimeTransport) -> JoinHandle<()> {
    let mut rx = transport.subscribe_status();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = *rx.borrow_and_update();
            println!("* connection {}", status);
        }
    })
}

/// Read lines on a dedicated thread; the channel closes on Ctrl-C or Ctrl-D.
///
/// Not `spawn_blocking`: a pending `readline` must not hold up runtime shutdown.
async fn spawn_line_reader() -> Result<mpsc::UnboundedReceiver<String>, ClientError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = oneshot::channel();

    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                report_ready(ready_tx, Err(e));
                return;
            }
        };
        if !report_ready(ready_tx, Ok(())) {
            return;
        }
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    if !line.trim().is_empty()
                        && let Err(e) = editor.add_history_entry(line.as_str())
                    {
                        tracing::debug!("History not updated: {}", e);
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Input error: {}", e);
                    break;
                }
            }
        }
    });

    match ready_rx.await {
        Ok(Ok(())) => Ok(rx),
        Ok(Err(e)) => Err(ClientError::Readline(e)),
        Err(_) => Err(ClientError::Readline(ReadlineError::Eof)),
    }
}

/// Hand the editor start-up result to the waiting caller.
///
/// Returns `false` when the caller has stopped waiting.
fn report_ready<E>(ready_tx: oneshot::Sender<Result<(), E>>, result: Result<(), E>) -> bool {
    match ready_tx.send(result) {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!("Line reader start-up result not delivered, caller is gone");
            false
        }
    }
}
