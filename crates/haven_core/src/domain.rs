//! crates/haven_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The fixed set of community topics a post can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    General,
    Anxiety,
    Depression,
    Relationships,
    Grief,
    Recovery,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::Anxiety => "anxiety",
            Topic::Depression => "depression",
            Topic::Relationships => "relationships",
            Topic::Grief => "grief",
            Topic::Recovery => "recovery",
        }
    }

    /// Parses a topic from its wire/storage form. Unknown strings are `None`;
    /// callers turn that into a validation error before touching the store.
    pub fn parse(s: &str) -> Option<Topic> {
        match s {
            "general" => Some(Topic::General),
            "anxiety" => Some(Topic::Anxiety),
            "depression" => Some(Topic::Depression),
            "relationships" => Some(Topic::Relationships),
            "grief" => Some(Topic::Grief),
            "recovery" => Some(Topic::Recovery),
            _ => None,
        }
    }

    /// Human-readable label, as shown in the topic sidebar.
    pub fn label(self) -> &'static str {
        match self {
            Topic::General => "General Support",
            Topic::Anxiety => "Anxiety & Stress",
            Topic::Depression => "Depression",
            Topic::Relationships => "Relationships",
            Topic::Grief => "Grief & Loss",
            Topic::Recovery => "Recovery Journey",
        }
    }
}

/// The three supportive reactions a signed-in user can give a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Hearts,
    Hugs,
    Relates,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 3] =
        [ReactionKind::Hearts, ReactionKind::Hugs, ReactionKind::Relates];

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Hearts => "hearts",
            ReactionKind::Hugs => "hugs",
            ReactionKind::Relates => "relates",
        }
    }

    pub fn parse(s: &str) -> Option<ReactionKind> {
        match s {
            "hearts" => Some(ReactionKind::Hearts),
            "hugs" => Some(ReactionKind::Hugs),
            "relates" => Some(ReactionKind::Relates),
            _ => None,
        }
    }
}

/// Denormalized per-post reaction totals. Counts never go negative, even if
/// decrements arrive out of order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionCounts {
    pub hearts: u32,
    pub hugs: u32,
    pub relates: u32,
}

impl ReactionCounts {
    pub fn get(&self, kind: ReactionKind) -> u32 {
        match kind {
            ReactionKind::Hearts => self.hearts,
            ReactionKind::Hugs => self.hugs,
            ReactionKind::Relates => self.relates,
        }
    }

    pub fn increment(&mut self, kind: ReactionKind) {
        let slot = self.slot(kind);
        *slot += 1;
    }

    /// Decrement with a floor at zero.
    pub fn decrement(&mut self, kind: ReactionKind) {
        let slot = self.slot(kind);
        *slot = slot.saturating_sub(1);
    }

    fn slot(&mut self, kind: ReactionKind) -> &mut u32 {
        match kind {
            ReactionKind::Hearts => &mut self.hearts,
            ReactionKind::Hugs => &mut self.hugs,
            ReactionKind::Relates => &mut self.relates,
        }
    }
}

/// A single turn in a companion conversation. Immutable once created, owned
/// by the thread that created it, and never persisted.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: u64,
    pub content: String,
    pub is_from_user: bool,
    pub timestamp: DateTime<Utc>,
}

/// A community post together with its replies and reaction totals.
///
/// `author_id` is a weak reference: deleting the user must not corrupt
/// anonymous-labeled content, so the label is copied into the row at
/// creation time rather than looked up later.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub topic: Topic,
    pub is_anonymous: bool,
    pub anonymous_label: Option<String>,
    pub author_name: Option<String>,
    pub counts: ReactionCounts,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// The name shown next to the post.
    pub fn display_author(&self) -> &str {
        if self.is_anonymous {
            self.anonymous_label.as_deref().unwrap_or("Anonymous")
        } else {
            self.author_name.as_deref().unwrap_or("User")
        }
    }
}

/// A reply under a post. `is_from_mentor` is true only for engine-generated
/// replies.
#[derive(Debug, Clone)]
pub struct Reply {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub is_anonymous: bool,
    pub anonymous_label: Option<String>,
    pub author_name: Option<String>,
    pub is_from_mentor: bool,
    pub created_at: DateTime<Utc>,
}

impl Reply {
    pub fn display_author(&self) -> &str {
        if self.is_from_mentor {
            "AI Mentor"
        } else if self.is_anonymous {
            self.anonymous_label.as_deref().unwrap_or("Anonymous")
        } else {
            self.author_name.as_deref().unwrap_or("User")
        }
    }
}

/// Everything the store needs to create a post. The anonymity flag is fixed
/// at creation and never changes afterwards.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub content: String,
    pub topic: Topic,
    pub is_anonymous: bool,
    pub anonymous_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub is_anonymous: bool,
    pub anonymous_label: Option<String>,
    pub is_from_mentor: bool,
}

/// An active reaction. Presence of a record means the reaction is on;
/// at most one record may exist per (post, user, kind) key.
#[derive(Debug, Clone)]
pub struct ReactionRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

/// A post as seen by one viewer: the post plus which reactions that viewer
/// currently has active on it.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub viewer_reactions: Vec<ReactionKind>,
}

// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Public-facing identity of a user for non-anonymous posts.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_counts_never_go_negative() {
        let mut counts = ReactionCounts::default();
        counts.decrement(ReactionKind::Hearts);
        assert_eq!(counts.hearts, 0);

        counts.increment(ReactionKind::Hearts);
        counts.decrement(ReactionKind::Hearts);
        counts.decrement(ReactionKind::Hearts);
        assert_eq!(counts.hearts, 0);
    }

    #[test]
    fn unknown_topic_is_rejected() {
        assert!(Topic::parse("venting").is_none());
        assert_eq!(Topic::parse("grief"), Some(Topic::Grief));
    }

    #[test]
    fn mentor_replies_display_as_mentor_regardless_of_label() {
        let reply = Reply {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            author_id: Uuid::nil(),
            content: "you are not alone".to_string(),
            is_anonymous: false,
            anonymous_label: Some("Gentle River".to_string()),
            author_name: None,
            is_from_mentor: true,
            created_at: Utc::now(),
        };
        assert_eq!(reply.display_author(), "AI Mentor");
    }
}
