//! crates/haven_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations - the hosted
//! PostgreSQL store and the self-contained in-memory store plug in behind the
//! same interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    NewPost, NewReply, Post, PostView, Profile, ReactionKind, ReactionRecord, Reply, Topic, User,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// This abstracts away the specific errors from external services and carries
/// the application's whole error taxonomy at the port boundary:
/// rejected input, missing sign-in, a lost race on a unique key, and
/// transient store failures.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Input was rejected before any side effect took place.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The operation requires a signed-in user.
    #[error("Unauthorized")]
    Unauthorized,
    /// Item not found.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write; somebody else's identical
    /// write already applied.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The backing store failed in a way that may succeed on resubmission.
    #[error("Store error: {0}")]
    Store(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Storage for community posts, replies and reactions.
///
/// `insert_reaction` and `delete_reaction` must be safe under retry: the
/// store enforces a uniqueness constraint on (post, user, kind) and surfaces
/// a duplicate insert as `PortError::Conflict`, never as a crash. Reaction
/// writes also adjust the owning post's denormalized counts, flooring at
/// zero on decrement.
#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn create_post(&self, new_post: NewPost) -> PortResult<Post>;

    async fn create_reply(&self, new_reply: NewReply) -> PortResult<Reply>;

    /// Lists posts newest-first, each with its replies (oldest first) and the
    /// viewer's currently-active reactions.
    async fn list_posts(&self, viewer: Uuid, topic: Option<Topic>) -> PortResult<Vec<PostView>>;

    async fn find_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> PortResult<Option<ReactionRecord>>;

    async fn insert_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> PortResult<ReactionRecord>;

    async fn delete_reaction(&self, reaction_id: Uuid) -> PortResult<()>;
}

/// Account and login-session storage. Supplies the nullable current-user
/// identity that every community mutation checks before touching the store.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Creates the account and its (initially bare) public profile.
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;
}
