//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection owns one companion conversation and one breathing
//! machine; this module routes client commands to them and spawns the
//! cancellable worker tasks that do the timed parts.

use crate::web::{
    breathing_task::breathing_process,
    chat_task::companion_reply_process,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, SessionState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New WebSocket connection established for user: {}", user_id);

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable
    // access across the worker tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender = Arc::new(Mutex::new(sender));
    let session_state_lock = Arc::new(Mutex::new(SessionState::new(user_id)));

    // --- 1. Greeting ---
    // Every new conversation opens with the companion's fixed greeting.
    let greeting = {
        let session = session_state_lock.lock().await;
        ServerMessage::message_appended(&session.thread.messages()[0])
    };
    if send(&ws_sender, &greeting).await.is_err() {
        error!("Failed to send greeting; closing connection.");
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(
                        text.to_string(),
                        &app_state,
                        &session_state_lock,
                        &ws_sender,
                    )
                    .await;
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    // The view is gone: no deferred reply may append to the disposed thread,
    // and no ticker may keep driving the machine.
    let mut session = session_state_lock.lock().await;
    session.reply_token.cancel();
    session.breathing_token.cancel();
    session.breathing.stop();
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: String,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
) {
    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(ClientMessage::Chat { content }) => {
            handle_chat(content, app_state, session_state_lock, ws_sender).await;
        }
        Ok(ClientMessage::StartBreathing { exercise_id }) => {
            handle_breathing_start(exercise_id, false, session_state_lock, ws_sender).await;
        }
        Ok(ClientMessage::RestartBreathing { exercise_id }) => {
            handle_breathing_start(exercise_id, true, session_state_lock, ws_sender).await;
        }
        Ok(ClientMessage::StopBreathing) => {
            info!("StopBreathing received. Cancelling ticker.");
            {
                let mut session = session_state_lock.lock().await;
                session.breathing_token.cancel();
                session.breathing.stop();
            }
            let _ = send(ws_sender, &ServerMessage::BreathingEnded).await;
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
        }
    }
}

async fn handle_chat(
    content: String,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
) {
    let outcome = {
        let mut session = session_state_lock.lock().await;
        match session.thread.push_user(&content) {
            Ok(message) => {
                let echo = ServerMessage::message_appended(message);
                // An accepted turn supersedes any reply still pending for
                // the previous one; a rejected turn leaves it alone.
                session.reply_token.cancel();
                session.reply_token = CancellationToken::new();
                Ok((echo, session.reply_token.clone()))
            }
            Err(e) => Err(e),
        }
    };

    match outcome {
        Ok((echo, token)) => {
            if send(ws_sender, &echo).await.is_err() {
                return;
            }
            let app_state = app_state.clone();
            let session_state_lock = session_state_lock.clone();
            let ws_sender = ws_sender.clone();
            tokio::spawn(async move {
                if let Err(e) = companion_reply_process(
                    app_state,
                    session_state_lock,
                    ws_sender,
                    content,
                    token,
                )
                .await
                {
                    error!("Companion reply task failed: {:?}", e);
                }
            });
        }
        Err(e) => {
            let _ = send(
                ws_sender,
                &ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
        }
    }
}

async fn handle_breathing_start(
    exercise_id: String,
    restart: bool,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
) {
    let started = {
        let mut session = session_state_lock.lock().await;
        let result = if restart {
            session.breathing.restart(&exercise_id)
        } else {
            session.breathing.start(&exercise_id)
        };
        match result {
            Ok(()) => {
                // Never two tickers for one session: the old one dies before
                // the new one is spawned.
                session.breathing_token.cancel();
                session.breathing_token = CancellationToken::new();
                Ok(session.breathing_token.clone())
            }
            // Unknown exercise: fail fast, leave any previous session alone.
            Err(e) => Err(e),
        }
    };

    match started {
        Ok(token) => {
            info!("Breathing session started: {}", exercise_id);
            let session_state_lock = session_state_lock.clone();
            let ws_sender = ws_sender.clone();
            tokio::spawn(async move {
                if let Err(e) = breathing_process(session_state_lock, ws_sender, token).await {
                    error!("Breathing ticker failed: {:?}", e);
                }
            });
        }
        Err(e) => {
            let _ = send(
                ws_sender,
                &ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
        }
    }
}

async fn send(
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).unwrap();
    ws_sender.lock().await.send(Message::Text(json.into())).await
}
