//! crates/haven_core/src/feed.rs
//!
//! Community feed orchestration: validates input, assigns anonymous labels,
//! and delegates persistence to whichever store implementation is plugged
//! in. Mutations are invalidate-then-refetch from the caller's perspective;
//! the feed never patches lists incrementally.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{NewPost, NewReply, Post, PostView, Reply, Topic};
use crate::identity::{self, LabelStyle};
use crate::ports::{CommunityStore, PortError, PortResult};
use crate::support;

/// The feed. `label_style` is fixed per variant: the hosted feed uses the
/// short "Adjective Noun" form, the self-contained feed uses the suffixed
/// form.
#[derive(Clone)]
pub struct CommunityFeed {
    store: Arc<dyn CommunityStore>,
    label_style: LabelStyle,
}

impl CommunityFeed {
    pub fn new(store: Arc<dyn CommunityStore>, label_style: LabelStyle) -> Self {
        Self { store, label_style }
    }

    /// Lists posts for a signed-in viewer, newest first.
    pub async fn posts(
        &self,
        viewer: Option<Uuid>,
        topic: Option<Topic>,
    ) -> PortResult<Vec<PostView>> {
        let viewer = viewer.ok_or(PortError::Unauthorized)?;
        self.store.list_posts(viewer, topic).await
    }

    /// Creates a post. Requires sign-in; rejects empty content before any
    /// store call; draws a fresh anonymous label when asked to.
    pub async fn submit_post(
        &self,
        viewer: Option<Uuid>,
        content: &str,
        topic: Topic,
        anonymous: bool,
    ) -> PortResult<Post> {
        let author_id = viewer.ok_or(PortError::Unauthorized)?;
        let content = non_empty(content, "post")?;
        let anonymous_label = anonymous.then(|| self.draw_label());

        self.store
            .create_post(NewPost {
                author_id,
                content,
                topic,
                is_anonymous: anonymous,
                anonymous_label,
            })
            .await
    }

    /// Creates a user-authored reply under a post.
    pub async fn submit_reply(
        &self,
        viewer: Option<Uuid>,
        post_id: Uuid,
        content: &str,
        anonymous: bool,
    ) -> PortResult<Reply> {
        let author_id = viewer.ok_or(PortError::Unauthorized)?;
        let content = non_empty(content, "reply")?;
        let anonymous_label = anonymous.then(|| self.draw_label());

        self.store
            .create_reply(NewReply {
                post_id,
                author_id,
                content,
                is_anonymous: anonymous,
                anonymous_label,
                is_from_mentor: false,
            })
            .await
    }

    /// Appends the mentor reply for a post: the mentor-table response to the
    /// post's content, recorded as an engine-authored reply. Only the
    /// self-contained variant schedules this.
    pub async fn append_mentor_reply(&self, post: &Post) -> PortResult<Reply> {
        let content = {
            let mut rng = rand::rng();
            support::MENTOR.respond(&post.content, &mut rng).to_string()
        };

        self.store
            .create_reply(NewReply {
                post_id: post.id,
                // System-authored; no user owns mentor replies.
                author_id: Uuid::nil(),
                content,
                is_anonymous: false,
                anonymous_label: None,
                is_from_mentor: true,
            })
            .await
    }

    fn draw_label(&self) -> String {
        let mut rng = rand::rng();
        identity::display_label(self.label_style, &mut rng)
    }
}

fn non_empty(content: &str, what: &str) -> PortResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PortError::Validation(format!(
            "{what} content must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn feed(style: LabelStyle) -> (CommunityFeed, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CommunityFeed::new(store.clone(), style), store)
    }

    #[tokio::test]
    async fn anonymous_posts_get_a_short_label() {
        let (feed, _) = feed(LabelStyle::Short);
        let user = Uuid::new_v4();

        let post = feed
            .submit_post(Some(user), "I feel so anxious about exams", Topic::Anxiety, true)
            .await
            .unwrap();

        assert!(post.is_anonymous);
        let label = post.anonymous_label.as_deref().unwrap();
        assert_eq!(label.split(' ').count(), 2);
        assert_eq!(post.display_author(), label);
    }

    #[tokio::test]
    async fn named_posts_carry_no_label() {
        let (feed, _) = feed(LabelStyle::Short);
        let post = feed
            .submit_post(Some(Uuid::new_v4()), "better today", Topic::Recovery, false)
            .await
            .unwrap();
        assert!(!post.is_anonymous);
        assert!(post.anonymous_label.is_none());
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_the_store_sees_it() {
        let (feed, store) = feed(LabelStyle::Short);
        let user = Uuid::new_v4();

        let err = feed
            .submit_post(Some(user), "  \n ", Topic::General, true)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert!(store.list_posts(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn signed_out_submissions_are_rejected() {
        let (feed, _) = feed(LabelStyle::Short);
        let err = feed
            .submit_post(None, "hello", Topic::General, false)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));

        let err = feed.posts(None, None).await.unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));
    }

    #[tokio::test]
    async fn mentor_reply_answers_the_post_in_the_mentor_voice() {
        let (feed, store) = feed(LabelStyle::Suffixed);
        let user = Uuid::new_v4();

        let post = feed
            .submit_post(Some(user), "I feel so anxious about exams", Topic::Anxiety, true)
            .await
            .unwrap();
        let label = post.anonymous_label.as_deref().unwrap();
        assert_eq!(label.split('_').count(), 3);

        let reply = feed.append_mentor_reply(&post).await.unwrap();
        assert!(reply.is_from_mentor);
        assert_eq!(
            reply.content,
            support::MENTOR.respond("I feel so anxious about exams", &mut rand::rng())
        );

        let views = store.list_posts(user, None).await.unwrap();
        assert_eq!(views[0].post.replies.len(), 1);
        assert_eq!(views[0].post.replies[0].display_author(), "AI Mentor");
    }
}
