//! services/api/src/web/breathing_task.rs
//!
//! This module contains the asynchronous "worker" function that drives a
//! breathing session: a 1 Hz ticker that advances the (purely functional)
//! machine and streams each snapshot to the client.

use crate::web::{protocol::ServerMessage, state::SessionState};
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, SinkExt};
use haven_core::ports::{PortError, PortResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Ticks the session's breathing machine once per second until the session
/// completes, is stopped, or the token is cancelled. Exactly one of these
/// runs per connection; starting a new session cancels the previous ticker
/// before this one is spawned.
pub async fn breathing_process(
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    token: CancellationToken,
) -> PortResult<()> {
    info!("Breathing ticker started.");

    // The first tick lands one second after the session starts.
    let mut ticker = interval_at(
        Instant::now() + Duration::from_secs(1),
        Duration::from_secs(1),
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Breathing ticker cancelled.");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let outgoing = {
            let mut session = session_state_lock.lock().await;
            if token.is_cancelled() {
                return Ok(());
            }
            match session.breathing.tick() {
                Some(snapshot) => ServerMessage::breathing_tick(&snapshot),
                // The machine collapsed back to idle: the session is over.
                None => ServerMessage::BreathingEnded,
            }
        };

        let finished = matches!(outgoing, ServerMessage::BreathingEnded);
        let json = serde_json::to_string(&outgoing).unwrap();
        if ws_sender.lock().await.send(Message::Text(json.into())).await.is_err() {
            return Err(PortError::Store(
                "Failed to send breathing update to client.".to_string(),
            ));
        }

        if finished {
            info!("Breathing session completed.");
            return Ok(());
        }
    }
}
