//! crates/haven_core/src/reactions.rs
//!
//! The reaction ledger: per-user, per-post, per-kind toggle state with
//! idempotence guaranteed by the store's uniqueness constraint rather than
//! in-process locking.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::ReactionKind;
use crate::ports::{CommunityStore, PortError, PortResult};

/// What a toggle did. `AlreadyApplied` means our insert lost a race against
/// an identical toggle; the caller should refresh its view and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    AlreadyApplied,
}

impl ToggleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ToggleOutcome::Added => "added",
            ToggleOutcome::Removed => "removed",
            ToggleOutcome::AlreadyApplied => "already_applied",
        }
    }
}

/// Mediates every reaction click. The operation is its own inverse: two
/// consecutive toggles with identical arguments return the ledger to its
/// original state.
#[derive(Clone)]
pub struct ReactionLedger {
    store: Arc<dyn CommunityStore>,
}

impl ReactionLedger {
    pub fn new(store: Arc<dyn CommunityStore>) -> Self {
        Self { store }
    }

    /// Toggles `kind` on `post_id` for the signed-in viewer.
    ///
    /// Unauthenticated callers are rejected before any store call. The
    /// check-then-act here is not atomic against the store, so a duplicate
    /// insert rejected by the uniqueness constraint is mapped to
    /// `AlreadyApplied` instead of an error.
    pub async fn toggle(
        &self,
        viewer: Option<Uuid>,
        post_id: Uuid,
        kind: ReactionKind,
    ) -> PortResult<ToggleOutcome> {
        let user_id = viewer.ok_or(PortError::Unauthorized)?;

        match self.store.find_reaction(post_id, user_id, kind).await? {
            Some(existing) => {
                self.store.delete_reaction(existing.id).await?;
                Ok(ToggleOutcome::Removed)
            }
            None => match self.store.insert_reaction(post_id, user_id, kind).await {
                Ok(_) => Ok(ToggleOutcome::Added),
                Err(PortError::Conflict(_)) => Ok(ToggleOutcome::AlreadyApplied),
                Err(e) => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewPost, Topic};
    use crate::memory::MemoryStore;

    async fn ledger_with_post() -> (ReactionLedger, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let post = store
            .create_post(NewPost {
                author_id: Uuid::new_v4(),
                content: "long week".to_string(),
                topic: Topic::General,
                is_anonymous: false,
                anonymous_label: None,
            })
            .await
            .unwrap();
        (ReactionLedger::new(store.clone()), store, post.id)
    }

    #[tokio::test]
    async fn double_toggle_restores_the_original_state() {
        let (ledger, store, post_id) = ledger_with_post().await;
        let user = Uuid::new_v4();

        let before = store.list_posts(user, None).await.unwrap()[0].post.counts;

        let first = ledger
            .toggle(Some(user), post_id, ReactionKind::Hearts)
            .await
            .unwrap();
        assert_eq!(first, ToggleOutcome::Added);

        let second = ledger
            .toggle(Some(user), post_id, ReactionKind::Hearts)
            .await
            .unwrap();
        assert_eq!(second, ToggleOutcome::Removed);

        let view = &store.list_posts(user, None).await.unwrap()[0];
        assert_eq!(view.post.counts, before);
        assert!(view.viewer_reactions.is_empty());
    }

    #[tokio::test]
    async fn unauthenticated_toggle_is_rejected_before_any_mutation() {
        let (ledger, store, post_id) = ledger_with_post().await;

        let err = ledger
            .toggle(None, post_id, ReactionKind::Relates)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));

        let view = &store.list_posts(Uuid::new_v4(), None).await.unwrap()[0];
        assert_eq!(view.post.counts.relates, 0);
    }

    #[tokio::test]
    async fn kinds_toggle_independently_per_user() {
        let (ledger, store, post_id) = ledger_with_post().await;
        let alice = Uuid::new_v4();
        let bo = Uuid::new_v4();

        ledger
            .toggle(Some(alice), post_id, ReactionKind::Hearts)
            .await
            .unwrap();
        ledger
            .toggle(Some(alice), post_id, ReactionKind::Hugs)
            .await
            .unwrap();
        ledger
            .toggle(Some(bo), post_id, ReactionKind::Hearts)
            .await
            .unwrap();

        let view = &store.list_posts(alice, None).await.unwrap()[0];
        assert_eq!(view.post.counts.hearts, 2);
        assert_eq!(view.post.counts.hugs, 1);
        assert_eq!(view.viewer_reactions.len(), 2);
    }

    #[tokio::test]
    async fn a_lost_insert_race_reads_as_already_applied() {
        let (ledger, store, post_id) = ledger_with_post().await;
        let user = Uuid::new_v4();

        // Simulate the other toggle landing between our find and insert.
        store
            .insert_reaction(post_id, user, ReactionKind::Hugs)
            .await
            .unwrap();
        let outcome = match store.insert_reaction(post_id, user, ReactionKind::Hugs).await {
            Err(PortError::Conflict(_)) => ToggleOutcome::AlreadyApplied,
            other => panic!("expected conflict, got {other:?}"),
        };
        assert_eq!(outcome, ToggleOutcome::AlreadyApplied);

        // And the ledger itself still sees exactly one active record.
        let removed = ledger
            .toggle(Some(user), post_id, ReactionKind::Hugs)
            .await
            .unwrap();
        assert_eq!(removed, ToggleOutcome::Removed);
    }
}
