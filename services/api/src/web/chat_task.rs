//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! producing one companion reply after the simulated thinking delay.

use crate::config::Config;
use crate::web::{
    protocol::ServerMessage,
    state::{AppState, SessionState},
};
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, SinkExt};
use haven_core::ports::{PortError, PortResult};
use haven_core::support;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The thinking delay before a generated reply: a fixed base plus uniform
/// jitter, so replies don't land with mechanical regularity.
pub fn thinking_delay(config: &Config) -> Duration {
    let jitter = if config.reply_jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..config.reply_jitter_ms)
    };
    Duration::from_millis(config.reply_delay_ms + jitter)
}

/// Waits out the thinking delay, then appends the companion's reply to the
/// conversation and pushes it to the client.
///
/// The task is cancellable at every await point: a cancelled token means the
/// turn was superseded or the connection is gone, and nothing may be
/// appended to the thread after that.
pub async fn companion_reply_process(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    user_text: String,
    token: CancellationToken,
) -> PortResult<()> {
    let typing = serde_json::to_string(&ServerMessage::CompanionTyping).unwrap();
    if ws_sender.lock().await.send(Message::Text(typing.into())).await.is_err() {
        return Err(PortError::Store(
            "Failed to send typing indicator to client.".to_string(),
        ));
    }

    let delay = thinking_delay(&app_state.config);
    tokio::select! {
        _ = token.cancelled() => {
            info!("Companion reply cancelled before the delay elapsed.");
            return Ok(());
        }
        _ = tokio::time::sleep(delay) => {}
    }

    let response = {
        let mut rng = rand::rng();
        support::COMPANION.respond(&user_text, &mut rng).to_string()
    };

    let appended = {
        let mut session = session_state_lock.lock().await;
        // Re-check under the lock: cancellation may have raced the sleep.
        if token.is_cancelled() {
            info!("Companion reply cancelled after the delay; dropping it.");
            return Ok(());
        }
        ServerMessage::message_appended(session.thread.push_companion(response))
    };

    let json = serde_json::to_string(&appended).unwrap();
    if ws_sender.lock().await.send(Message::Text(json.into())).await.is_err() {
        return Err(PortError::Store(
            "Failed to send companion reply to client.".to_string(),
        ));
    }

    Ok(())
}
