//! crates/haven_core/src/conversation.rs
//!
//! An in-memory companion conversation. The thread owns its messages
//! exclusively; they are immutable once appended and vanish with the thread.
//! Nothing here is persisted or shared between users.

use chrono::Utc;

use crate::domain::Message;
use crate::ports::{PortError, PortResult};

/// The fixed opening turn every new thread is seeded with.
pub const GREETING: &str = "Hi there! I'm your companion. I'm here to listen without judgment and support you through whatever you're feeling. What's on your mind today? 💚";

/// An ordered conversation. Message ids come from a per-thread monotonic
/// counter, which is all the ordering the UI needs.
#[derive(Debug)]
pub struct ConversationThread {
    messages: Vec<Message>,
    next_id: u64,
}

impl ConversationThread {
    pub fn new() -> Self {
        let mut thread = Self {
            messages: Vec::new(),
            next_id: 1,
        };
        thread.append(GREETING.to_string(), false);
        thread
    }

    /// Appends a user turn. Empty or whitespace-only content is rejected
    /// before anything is recorded.
    pub fn push_user(&mut self, content: &str) -> PortResult<&Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PortError::Validation(
                "message content must not be empty".to_string(),
            ));
        }
        Ok(self.append(content.to_string(), true))
    }

    /// Appends an engine-generated companion turn.
    pub fn push_companion(&mut self, content: String) -> &Message {
        self.append(content, false)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn append(&mut self, content: String, is_from_user: bool) -> &Message {
        let message = Message {
            id: self.next_id,
            content,
            is_from_user,
            timestamp: Utc::now(),
        };
        self.next_id += 1;
        self.messages.push(message);
        self.messages.last().expect("just pushed")
    }
}

impl Default for ConversationThread {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_threads_open_with_the_greeting() {
        let thread = ConversationThread::new();
        assert_eq!(thread.messages().len(), 1);
        assert_eq!(thread.messages()[0].content, GREETING);
        assert!(!thread.messages()[0].is_from_user);
    }

    #[test]
    fn ids_are_monotonic_across_turns() {
        let mut thread = ConversationThread::new();
        thread.push_user("rough day").unwrap();
        thread.push_companion("I'm listening.".to_string());
        thread.push_user("thanks").unwrap();

        let ids: Vec<u64> = thread.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_user_messages_are_rejected_without_a_side_effect() {
        let mut thread = ConversationThread::new();
        let err = thread.push_user("   ").unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert_eq!(thread.messages().len(), 1);
    }
}
