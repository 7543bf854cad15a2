//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::config::Config;
use haven_core::breathing::BreathingMachine;
use haven_core::conversation::ConversationThread;
use haven_core::feed::CommunityFeed;
use haven_core::ports::AuthStore;
use haven_core::reactions::ReactionLedger;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all
/// handlers. The store ports are trait objects: the PostgreSQL adapter and
/// the in-memory repository both fit behind them.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthStore>,
    pub feed: CommunityFeed,
    pub ledger: ReactionLedger,
    pub config: Arc<Config>,
    /// Cancelled on shutdown; pending deferred mentor replies select on it.
    pub shutdown: CancellationToken,
    /// True only for the self-contained (memory) variant.
    pub mentor_replies_enabled: bool,
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection: one companion
/// conversation and one breathing machine, plus the cancellation tokens for
/// the tasks currently attached to them.
///
/// Token discipline: at most one pending companion reply and one breathing
/// ticker exist per connection. Replacing either starts from cancelling the
/// old token, so no task ever appends to a superseded conversation turn and
/// no two tickers drive the same machine.
pub struct SessionState {
    pub user_id: Uuid,
    pub thread: ConversationThread,
    pub breathing: BreathingMachine,
    pub reply_token: CancellationToken,
    pub breathing_token: CancellationToken,
}

impl SessionState {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            thread: ConversationThread::new(),
            breathing: BreathingMachine::new(),
            reply_token: CancellationToken::new(),
            breathing_token: CancellationToken::new(),
        }
    }
}
