//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server. One connection hosts both interactive subsystems: the
//! companion conversation and the breathing session.

use haven_core::breathing::BreathingSnapshot;
use haven_core::domain::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A user turn in the companion conversation. The reply follows after a
    /// short "thinking" delay.
    Chat { content: String },

    /// Starts (or replaces) a breathing session for the given exercise.
    StartBreathing { exercise_id: String },

    /// Stops the running breathing session, discarding its progress.
    StopBreathing,

    /// Stops and immediately starts the given exercise from the top.
    RestartBreathing { exercise_id: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A turn was appended to the conversation - the user's own echoed turn
    /// or the companion's reply.
    MessageAppended {
        id: u64,
        content: String,
        is_from_user: bool,
        timestamp: DateTime<Utc>,
    },

    /// The companion is "thinking"; the UI can show a typing indicator.
    CompanionTyping,

    /// One second of breathing session elapsed. Sent at 1 Hz while running.
    BreathingTick {
        exercise_id: String,
        phase: String,
        instruction: String,
        seconds_into_phase: u32,
        cycle: u32,
        total_cycles: u32,
        progress: f64,
    },

    /// The breathing session finished its cycles or was stopped.
    BreathingEnded,

    /// Reports an error to the client, which should display it inline.
    Error { message: String },
}

impl ServerMessage {
    pub fn message_appended(message: &Message) -> Self {
        ServerMessage::MessageAppended {
            id: message.id,
            content: message.content.clone(),
            is_from_user: message.is_from_user,
            timestamp: message.timestamp,
        }
    }

    pub fn breathing_tick(snapshot: &BreathingSnapshot) -> Self {
        ServerMessage::BreathingTick {
            exercise_id: snapshot.exercise_id.to_string(),
            phase: snapshot.phase.as_str().to_string(),
            instruction: format!(
                "{} {}",
                snapshot.phase.instruction(),
                snapshot.seconds_into_phase
            ),
            seconds_into_phase: snapshot.seconds_into_phase,
            cycle: snapshot.cycle,
            total_cycles: snapshot.total_cycles,
            progress: snapshot.progress,
        }
    }
}
