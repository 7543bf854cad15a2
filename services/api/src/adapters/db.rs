//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `CommunityStore` and `AuthStore` ports from the
//! `haven_core` crate. It handles all interactions with the PostgreSQL
//! database using `sqlx`.
//!
//! The reaction uniqueness invariant lives in the schema: a unique index on
//! (post_id, user_id, reaction_type) turns a racing duplicate insert into a
//! constraint violation, which this adapter maps to `PortError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haven_core::domain::{
    NewPost, NewReply, Post, PostView, Profile, ReactionCounts, ReactionKind, ReactionRecord,
    Reply, Topic, User, UserCredentials,
};
use haven_core::ports::{AuthStore, CommunityStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports against PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a sqlx error to the port taxonomy. Constraint violations carry
/// meaning here: a unique violation is a lost toggle race, a foreign-key
/// violation is a dangling post reference.
fn store_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            PortError::NotFound(db.to_string())
        }
        _ => PortError::Store(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct PostRecord {
    id: Uuid,
    user_id: Uuid,
    content: String,
    topic: String,
    is_anonymous: bool,
    anonymous_name: Option<String>,
    hearts: i32,
    hugs: i32,
    relates: i32,
    created_at: DateTime<Utc>,
    username: Option<String>,
    display_name: Option<String>,
}

impl PostRecord {
    fn to_domain(self, replies: Vec<Reply>) -> PortResult<Post> {
        let topic = Topic::parse(&self.topic)
            .ok_or_else(|| PortError::Store(format!("unknown topic '{}' in row", self.topic)))?;
        Ok(Post {
            id: self.id,
            author_id: self.user_id,
            content: self.content,
            topic,
            is_anonymous: self.is_anonymous,
            anonymous_label: self.anonymous_name,
            author_name: self.display_name.or(self.username),
            counts: ReactionCounts {
                hearts: self.hearts.max(0) as u32,
                hugs: self.hugs.max(0) as u32,
                relates: self.relates.max(0) as u32,
            },
            replies,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReplyRecord {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    content: String,
    is_anonymous: bool,
    anonymous_name: Option<String>,
    is_from_mentor: bool,
    created_at: DateTime<Utc>,
    username: Option<String>,
    display_name: Option<String>,
}

impl ReplyRecord {
    fn to_domain(self) -> Reply {
        Reply {
            id: self.id,
            post_id: self.post_id,
            author_id: self.user_id,
            content: self.content,
            is_anonymous: self.is_anonymous,
            anonymous_label: self.anonymous_name,
            author_name: self.display_name.or(self.username),
            is_from_mentor: self.is_from_mentor,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReactionRow {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    reaction_type: String,
    created_at: DateTime<Utc>,
}

impl ReactionRow {
    fn to_domain(self) -> PortResult<ReactionRecord> {
        let kind = ReactionKind::parse(&self.reaction_type).ok_or_else(|| {
            PortError::Store(format!("unknown reaction '{}' in row", self.reaction_type))
        })?;
        Ok(ReactionRecord {
            id: self.id,
            post_id: self.post_id,
            user_id: self.user_id,
            kind,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    username: Option<String>,
    display_name: Option<String>,
}

//=========================================================================================
// `CommunityStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CommunityStore for PgStore {
    async fn create_post(&self, new_post: NewPost) -> PortResult<Post> {
        let record = sqlx::query_as::<_, PostRecord>(
            "INSERT INTO posts (id, user_id, content, topic, is_anonymous, anonymous_name)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, user_id, content, topic, is_anonymous, anonymous_name,
                       hearts, hugs, relates, created_at,
                       NULL::TEXT AS username, NULL::TEXT AS display_name",
        )
        .bind(Uuid::new_v4())
        .bind(new_post.author_id)
        .bind(&new_post.content)
        .bind(new_post.topic.as_str())
        .bind(new_post.is_anonymous)
        .bind(&new_post.anonymous_label)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        let author_name = self.author_name(new_post.author_id).await?;
        let mut post = record.to_domain(Vec::new())?;
        post.author_name = author_name;
        Ok(post)
    }

    async fn create_reply(&self, new_reply: NewReply) -> PortResult<Reply> {
        let record = sqlx::query_as::<_, ReplyRecord>(
            "INSERT INTO replies (id, post_id, user_id, content, is_anonymous, anonymous_name, is_from_mentor)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, post_id, user_id, content, is_anonymous, anonymous_name,
                       is_from_mentor, created_at,
                       NULL::TEXT AS username, NULL::TEXT AS display_name",
        )
        .bind(Uuid::new_v4())
        .bind(new_reply.post_id)
        .bind(new_reply.author_id)
        .bind(&new_reply.content)
        .bind(new_reply.is_anonymous)
        .bind(&new_reply.anonymous_label)
        .bind(new_reply.is_from_mentor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Post {} not found", new_reply.post_id))
            }
            _ => store_error(e),
        })?;

        let author_name = self.author_name(new_reply.author_id).await?;
        let mut reply = record.to_domain();
        reply.author_name = author_name;
        Ok(reply)
    }

    async fn list_posts(&self, viewer: Uuid, topic: Option<Topic>) -> PortResult<Vec<PostView>> {
        let post_records = sqlx::query_as::<_, PostRecord>(
            "SELECT p.id, p.user_id, p.content, p.topic, p.is_anonymous, p.anonymous_name,
                    p.hearts, p.hugs, p.relates, p.created_at,
                    pr.username, pr.display_name
             FROM posts p
             LEFT JOIN profiles pr ON pr.user_id = p.user_id
             WHERE ($1::TEXT IS NULL OR p.topic = $1)
             ORDER BY p.created_at DESC",
        )
        .bind(topic.map(Topic::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let post_ids: Vec<Uuid> = post_records.iter().map(|p| p.id).collect();

        let reply_records = sqlx::query_as::<_, ReplyRecord>(
            "SELECT r.id, r.post_id, r.user_id, r.content, r.is_anonymous, r.anonymous_name,
                    r.is_from_mentor, r.created_at,
                    pr.username, pr.display_name
             FROM replies r
             LEFT JOIN profiles pr ON pr.user_id = r.user_id
             WHERE r.post_id = ANY($1)
             ORDER BY r.created_at ASC",
        )
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let reaction_rows = sqlx::query_as::<_, ReactionRow>(
            "SELECT id, post_id, user_id, reaction_type, created_at
             FROM post_reactions
             WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(viewer)
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let mut replies_by_post: HashMap<Uuid, Vec<Reply>> = HashMap::new();
        for record in reply_records {
            replies_by_post
                .entry(record.post_id)
                .or_default()
                .push(record.to_domain());
        }

        let mut viewer_reactions: HashMap<Uuid, Vec<ReactionKind>> = HashMap::new();
        for row in reaction_rows {
            let record = row.to_domain()?;
            viewer_reactions
                .entry(record.post_id)
                .or_default()
                .push(record.kind);
        }

        post_records
            .into_iter()
            .map(|record| {
                let replies = replies_by_post.remove(&record.id).unwrap_or_default();
                let reactions = viewer_reactions.remove(&record.id).unwrap_or_default();
                Ok(PostView {
                    post: record.to_domain(replies)?,
                    viewer_reactions: reactions,
                })
            })
            .collect()
    }

    async fn find_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> PortResult<Option<ReactionRecord>> {
        let row = sqlx::query_as::<_, ReactionRow>(
            "SELECT id, post_id, user_id, reaction_type, created_at
             FROM post_reactions
             WHERE post_id = $1 AND user_id = $2 AND reaction_type = $3",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(ReactionRow::to_domain).transpose()
    }

    async fn insert_reaction(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> PortResult<ReactionRecord> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let row = sqlx::query_as::<_, ReactionRow>(
            "INSERT INTO post_reactions (id, post_id, user_id, reaction_type)
             VALUES ($1, $2, $3, $4)
             RETURNING id, post_id, user_id, reaction_type, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        // Column name is fixed by the enum, not by user input.
        let bump = format!("UPDATE posts SET {0} = {0} + 1 WHERE id = $1", kind.as_str());
        sqlx::query(&bump)
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        row.to_domain()
    }

    async fn delete_reaction(&self, reaction_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let deleted = sqlx::query_as::<_, ReactionRow>(
            "DELETE FROM post_reactions WHERE id = $1
             RETURNING id, post_id, user_id, reaction_type, created_at",
        )
        .bind(reaction_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error)?;

        // Already gone: a concurrent toggle won; nothing to decrement.
        let Some(row) = deleted else {
            return Ok(());
        };
        let record = row.to_domain()?;

        let lower = format!(
            "UPDATE posts SET {0} = GREATEST({0} - 1, 0) WHERE id = $1",
            record.kind.as_str()
        );
        sqlx::query(&lower)
            .bind(record.post_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok(())
    }
}

impl PgStore {
    /// Resolves the public display name for a user, if a profile exists.
    async fn author_name(&self, user_id: Uuid) -> PortResult<Option<String>> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, username, display_name FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(record.and_then(|p| p.display_name.or(p.username)))
    }
}

//=========================================================================================
// `AuthStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthStore for PgStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let user_id = Uuid::new_v4();

        sqlx::query("INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(hashed_password)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        // Seed the public profile with the email's local part as a username.
        let username = email.split('@').next();
        sqlx::query("INSERT INTO profiles (user_id, username) VALUES ($1, $2)")
            .bind(user_id)
            .bind(username)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("no account for {}", email))
            }
            _ => store_error(e),
        })?;

        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, username, display_name FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Profile {} not found", user_id))
            }
            _ => store_error(e),
        })?;

        Ok(Profile {
            user_id: record.user_id,
            username: record.username,
            display_name: record.display_name,
        })
    }
}
