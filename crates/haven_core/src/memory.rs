//! crates/haven_core/src/memory.rs
//!
//! The self-contained, in-process repository. It implements the same store
//! ports as the hosted PostgreSQL adapter, so the feed, ledger and handlers
//! are identical regardless of backing implementation - you swap the
//! repository, not the component. It also doubles as the deterministic
//! store for tests.
//!
//! All state lives behind one `std::sync::Mutex`; no method holds the lock
//! across an await point. The uniqueness invariant on
//! (post, user, reaction kind) is enforced here exactly as the database
//! constraint enforces it in the hosted variant.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    AuthSession, NewPost, NewReply, Post, PostView, Profile, ReactionKind, ReactionRecord, Reply,
    Topic, User, UserCredentials,
};
use crate::ports::{AuthStore, CommunityStore, PortError, PortResult};

#[derive(Default)]
struct Inner {
    // Posts in insertion order; listing walks them newest-first.
    posts: Vec<Post>,
    reactions: Vec<ReactionRecord>,
    credentials: HashMap<String, UserCredentials>,
    profiles: HashMap<Uuid, Profile>,
    sessions: HashMap<String, AuthSession>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    async fn create_post(&self, new_post: NewPost) -> PortResult<Post> {
        let mut inner = self.lock();
        let author_name = inner
            .profiles
            .get(&new_post.author_id)
            .and_then(|p| p.display_name.clone().or_else(|| p.username.clone()));
        let post = Post {
            id: Uuid::new_v4(),
            author_id: new_post.author_id,
            content: new_post.content,
            topic: new_post.topic,
            is_anonymous: new_post.is_anonymous,
            anonymous_label: new_post.anonymous_label,
            author_name,
            counts: Default::default(),
            replies: Vec::new(),
            created_at: Utc::now(),
        };
        inner.posts.push(post.clone());
        Ok(post)
    }

    async fn create_reply(&self, new_reply: NewReply) -> PortResult<Reply> {
        let mut inner = self.lock();
        let author_name = inner
            .profiles
            .get(&new_reply.author_id)
            .and_then(|p| p.display_name.clone().or_else(|| p.username.clone()));
        let reply = Reply {
            id: Uuid::new_v4(),
            post_id: new_reply.post_id,
            author_id: new_reply.author_id,
            content: new_reply.content,
            is_anonymous: new_reply.is_anonymous,
            anonymous_label: new_reply.anonymous_label,
            author_name,
            is_from_mentor: new_reply.is_from_mentor,
            created_at: Utc::now(),
        };
        let post = inner
            .posts
            .iter_mut()
            .find(|p| p.id == new_reply.post_id)
            .ok_or_else(|| PortError::NotFound(format!("Post {} not found", new_reply.post_id)))?;
        post.replies.push(reply.clone());
        Ok(reply)
    }

    async fn list_posts(&self, viewer: Uuid, topic: Option<Topic>) -> PortResult<Vec<PostView>> {
        let inner = self.lock();
        let views = inner
            .posts
            .iter()
            .rev()
            .filter(|p| topic.map_or(true, |t| p.topic == t))
            .map(|post| PostView {
                post: post.clone(),
                viewer_reactions: inner
                    .reactions
                    .iter()
                    .filter(|r| r.post_id == post.id && r.user_id == viewer)
                    .map(|r| r.kind)
                    .collect(),
            })
            .collect();
        Ok(views)
    }

    async fn find_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> PortResult<Option<ReactionRecord>> {
        let inner = self.lock();
        Ok(inner
            .reactions
            .iter()
            .find(|r| r.post_id == post_id && r.user_id == user_id && r.kind == kind)
            .cloned())
    }

    async fn insert_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> PortResult<ReactionRecord> {
        let mut inner = self.lock();
        let duplicate = inner
            .reactions
            .iter()
            .any(|r| r.post_id == post_id && r.user_id == user_id && r.kind == kind);
        if duplicate {
            return Err(PortError::Conflict(format!(
                "reaction ({post_id}, {user_id}, {}) already active",
                kind.as_str()
            )));
        }
        let post = inner
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| PortError::NotFound(format!("Post {post_id} not found")))?;
        post.counts.increment(kind);
        let record = ReactionRecord {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            kind,
            created_at: Utc::now(),
        };
        inner.reactions.push(record.clone());
        Ok(record)
    }

    async fn delete_reaction(&self, reaction_id: Uuid) -> PortResult<()> {
        let mut inner = self.lock();
        // A record that is already gone means a concurrent toggle beat us;
        // deleting nothing keeps the operation retry-safe.
        let Some(index) = inner.reactions.iter().position(|r| r.id == reaction_id) else {
            return Ok(());
        };
        let record = inner.reactions.remove(index);
        if let Some(post) = inner.posts.iter_mut().find(|p| p.id == record.post_id) {
            post.counts.decrement(record.kind);
        }
        Ok(())
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut inner = self.lock();
        if inner.credentials.contains_key(email) {
            return Err(PortError::Conflict(format!(
                "account for {email} already exists"
            )));
        }
        let user_id = Uuid::new_v4();
        inner.credentials.insert(
            email.to_string(),
            UserCredentials {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        let username = email.split('@').next().map(str::to_string);
        inner.profiles.insert(
            user_id,
            Profile {
                user_id,
                username,
                display_name: None,
            },
        );
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let inner = self.lock();
        inner
            .credentials
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("no account for {email}")))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: chrono::DateTime<Utc>,
    ) -> PortResult<()> {
        let mut inner = self.lock();
        inner.sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let inner = self.lock();
        let session = inner
            .sessions
            .get(session_id)
            .ok_or_else(|| PortError::NotFound("auth session not found".to_string()))?;
        if session.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(session.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let mut inner = self.lock();
        inner.sessions.remove(session_id);
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let inner = self.lock();
        inner
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Profile {user_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(author_id: Uuid, content: &str, topic: Topic) -> NewPost {
        NewPost {
            author_id,
            content: content.to_string(),
            topic,
            is_anonymous: false,
            anonymous_label: None,
        }
    }

    #[tokio::test]
    async fn duplicate_reaction_insert_is_a_conflict() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let post = store
            .create_post(new_post(user, "hello", Topic::General))
            .await
            .unwrap();

        store
            .insert_reaction(post.id, user, ReactionKind::Hugs)
            .await
            .unwrap();
        let err = store
            .insert_reaction(post.id, user, ReactionKind::Hugs)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));

        // The lost race must not double-count.
        let views = store.list_posts(user, None).await.unwrap();
        assert_eq!(views[0].post.counts.hugs, 1);
    }

    #[tokio::test]
    async fn deleting_a_missing_reaction_is_a_no_op() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let post = store
            .create_post(new_post(user, "hello", Topic::General))
            .await
            .unwrap();

        store.delete_reaction(Uuid::new_v4()).await.unwrap();
        let views = store.list_posts(user, None).await.unwrap();
        assert_eq!(views[0].post.counts, Default::default());
    }

    #[tokio::test]
    async fn posts_list_newest_first_with_viewer_flags() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let first = store
            .create_post(new_post(user, "first", Topic::Anxiety))
            .await
            .unwrap();
        let second = store
            .create_post(new_post(user, "second", Topic::General))
            .await
            .unwrap();
        store
            .insert_reaction(first.id, user, ReactionKind::Hearts)
            .await
            .unwrap();

        let views = store.list_posts(user, None).await.unwrap();
        assert_eq!(views[0].post.id, second.id);
        assert_eq!(views[1].post.id, first.id);
        assert_eq!(views[1].viewer_reactions, vec![ReactionKind::Hearts]);

        let anxious_only = store.list_posts(user, Some(Topic::Anxiety)).await.unwrap();
        assert_eq!(anxious_only.len(), 1);
        assert_eq!(anxious_only[0].post.id, first.id);
    }

    #[tokio::test]
    async fn replies_append_in_order() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let post = store
            .create_post(new_post(user, "hello", Topic::General))
            .await
            .unwrap();

        for content in ["one", "two"] {
            store
                .create_reply(NewReply {
                    post_id: post.id,
                    author_id: user,
                    content: content.to_string(),
                    is_anonymous: false,
                    anonymous_label: None,
                    is_from_mentor: false,
                })
                .await
                .unwrap();
        }

        let views = store.list_posts(user, None).await.unwrap();
        let replies: Vec<&str> = views[0]
            .post
            .replies
            .iter()
            .map(|r| r.content.as_str())
            .collect();
        assert_eq!(replies, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn expired_auth_sessions_do_not_validate() {
        let store = MemoryStore::new();
        let user = store
            .create_user_with_email("quiet@example.com", "hash")
            .await
            .unwrap();
        store
            .create_auth_session("expired", user.user_id, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert!(store.validate_auth_session("expired").await.is_err());

        store
            .create_auth_session("live", user.user_id, Utc::now() + chrono::Duration::days(30))
            .await
            .unwrap();
        assert_eq!(
            store.validate_auth_session("live").await.unwrap(),
            user.user_id
        );
    }
}
