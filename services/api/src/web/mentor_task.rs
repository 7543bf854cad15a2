//! services/api/src/web/mentor_task.rs
//!
//! This module contains the asynchronous "worker" function that appends the
//! deferred mentor reply to a freshly created community post. Only the
//! self-contained (memory-backed) variant schedules it.

use haven_core::domain::Post;
use haven_core::feed::CommunityFeed;
use haven_core::ports::PortResult;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Waits out the thinking delay, then appends the mentor reply to the post.
///
/// The token is the service-wide shutdown token: if the service goes away
/// while the reply is pending, the append is suppressed rather than racing
/// teardown.
pub async fn mentor_reply_process(
    feed: CommunityFeed,
    post: Post,
    delay: Duration,
    token: CancellationToken,
) -> PortResult<()> {
    tokio::select! {
        _ = token.cancelled() => {
            info!("Mentor reply for post {} cancelled before the delay elapsed.", post.id);
            return Ok(());
        }
        _ = tokio::time::sleep(delay) => {}
    }

    let reply = feed.append_mentor_reply(&post).await?;
    info!("Mentor reply {} appended to post {}.", reply.id, post.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::domain::Topic;
    use haven_core::identity::LabelStyle;
    use haven_core::memory::MemoryStore;
    use haven_core::ports::CommunityStore;
    use haven_core::support;
    use std::sync::Arc;
    use uuid::Uuid;

    fn local_feed() -> (CommunityFeed, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            CommunityFeed::new(store.clone(), LabelStyle::Suffixed),
            store,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_post_gets_the_anxiety_mentor_reply_after_the_delay() {
        let (feed, store) = local_feed();
        let user = Uuid::new_v4();

        let post = feed
            .submit_post(
                Some(user),
                "I feel so anxious about exams",
                Topic::Anxiety,
                true,
            )
            .await
            .unwrap();
        assert!(post.is_anonymous);
        let label = post.anonymous_label.as_deref().unwrap();
        assert!(
            label.split(' ').count() == 2 || label.split('_').count() == 3,
            "unexpected label format: {label}"
        );

        let handle = tokio::spawn(mentor_reply_process(
            feed,
            post.clone(),
            Duration::from_millis(2500),
            CancellationToken::new(),
        ));

        // Just before the delay elapses: no reply yet.
        tokio::time::sleep(Duration::from_millis(2400)).await;
        let views = store.list_posts(user, None).await.unwrap();
        assert!(views[0].post.replies.is_empty());

        // And just after: the anxiety mentor response, attributed to the mentor.
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.await.unwrap().unwrap();

        let views = store.list_posts(user, None).await.unwrap();
        let reply = &views[0].post.replies[0];
        assert!(reply.is_from_mentor);
        assert_eq!(
            reply.content,
            support::MENTOR.respond("I feel so anxious about exams", &mut rand::rng())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_suppresses_the_pending_reply() {
        let (feed, store) = local_feed();
        let user = Uuid::new_v4();

        let post = feed
            .submit_post(Some(user), "feeling okay, just checking in", Topic::General, false)
            .await
            .unwrap();

        let token = CancellationToken::new();
        let handle = tokio::spawn(mentor_reply_process(
            feed,
            post,
            Duration::from_millis(2000),
            token.clone(),
        ));

        token.cancel();
        handle.await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5000)).await;
        let views = store.list_posts(user, None).await.unwrap();
        assert!(views[0].post.replies.is_empty());
    }
}
