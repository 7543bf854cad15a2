//! crates/haven_core/src/support.rs
//!
//! The rule-based supportive-response engine shared by the companion chat
//! and the community mentor-reply feature.
//!
//! Matching is deliberately simple: lower-case the input, then walk an
//! ordered rule list top-to-bottom and return the first rule whose keyword
//! set matches. The rule order is part of the contract - reordering rules
//! changes observable behavior. When nothing matches, one response is drawn
//! uniformly from a fallback pool through the caller-supplied random source,
//! which keeps the category branch pure and the fallback branch testable
//! with a seeded generator.

use rand::Rng;

/// One (keyword set, fixed response) pair. A rule matches when the lowered
/// input contains any of its keywords.
pub struct ResponseRule {
    pub keywords: &'static [&'static str],
    pub response: &'static str,
}

/// An ordered rule list plus a fallback pool. The companion and mentor
/// tables are kept separate on purpose: the tone and pronoun usage differ,
/// so they must never be merged.
pub struct ResponseTable {
    rules: &'static [ResponseRule],
    fallbacks: &'static [&'static str],
}

impl ResponseTable {
    /// Returns the response for `input`.
    ///
    /// The category branch is deterministic: the first rule (in declaration
    /// order) with a keyword contained in the lowered input wins. Only the
    /// no-match branch consumes randomness. Empty or whitespace-only input
    /// matches no keyword and lands in the fallback pool.
    pub fn respond<R: Rng + ?Sized>(&self, input: &str, rng: &mut R) -> &'static str {
        let lowered = input.to_lowercase();
        for rule in self.rules {
            if rule.keywords.iter().any(|k| lowered.contains(k)) {
                return rule.response;
            }
        }
        self.fallbacks[rng.random_range(0..self.fallbacks.len())]
    }

    /// The fallback pool, exposed for membership assertions in tests.
    pub fn fallbacks(&self) -> &'static [&'static str] {
        self.fallbacks
    }
}

/// First-person companion table, used by the chat thread.
///
/// Priority order: anxiety, sadness, overwhelm, anger, fatigue, gratitude.
pub static COMPANION: ResponseTable = ResponseTable {
    rules: &[
        ResponseRule {
            keywords: &["anxious", "anxiety"],
            response: "I hear that you're feeling anxious. That's a completely normal feeling, and I'm here with you. Try this: Take a deep breath in for 4 counts, hold for 4, then breathe out for 6. Your feelings are valid, and this moment will pass. 🌸",
        },
        ResponseRule {
            keywords: &["sad", "depressed", "down"],
            response: "I'm sorry you're feeling this way. It takes courage to share these feelings. Remember that feeling sad doesn't mean you're broken - it means you're human. Would you like to try a gentle activity together, or would you prefer to talk about what's making you feel this way? 💙",
        },
        ResponseRule {
            keywords: &["stressed", "overwhelmed"],
            response: "Feeling overwhelmed can be really tough. Let's break things down together. Sometimes when everything feels too much, focusing on just one small thing can help. What's one tiny step you could take right now? I believe in you. ✨",
        },
        ResponseRule {
            keywords: &["angry", "mad", "frustrated"],
            response: "Your anger is valid - it's telling you something important. Take a moment to breathe. Sometimes anger is protecting other feelings like hurt or fear. I'm here to listen to whatever you're experiencing without judgment. 🔥➡️💚",
        },
        ResponseRule {
            keywords: &["tired", "exhausted"],
            response: "It sounds like you're carrying a heavy load. Rest isn't selfish - it's necessary. Your worth isn't determined by your productivity. Be gentle with yourself today. 🌙",
        },
        ResponseRule {
            keywords: &["thank", "grateful"],
            response: "It means so much to hear that! Remember, you have the strength within you - I'm just here to remind you of it. You're doing great by taking care of your mental health. 🌟",
        },
    ],
    fallbacks: &[
        "Thank you for sharing that with me. Your feelings matter, and I'm here to listen. Can you tell me more about what's been on your mind? 💚",
        "I appreciate you opening up. That takes courage. How can I best support you right now? 🤗",
        "You're not alone in feeling this way. Many people experience similar emotions. What would feel most helpful to you in this moment? 🌸",
        "I hear you, and your experience is valid. Sometimes just being heard can make a difference. How are you taking care of yourself today? ✨",
    ],
};

/// Third-person mentor table, used for community replies. Same category
/// spine as the companion table with slightly wider keyword sets.
///
/// Priority order: anxiety, sadness, overwhelm, anger, fatigue, gratitude.
pub static MENTOR: ResponseTable = ResponseTable {
    rules: &[
        ResponseRule {
            keywords: &["anxious", "anxiety", "panic", "worried"],
            response: "Anxiety has a way of making everything feel urgent and impossible at once. Sharing it here took courage, and this community understands that feeling well. Grounding can help: notice five things you can see, four you can hear, three you can touch. This feeling is real, and it will pass. 🌸",
        },
        ResponseRule {
            keywords: &["sad", "depressed", "down", "lonely"],
            response: "Thank you for trusting this space with something so heavy. Sadness deserves room to be felt, not hidden. Whoever reads this and feels the same: you are not broken, and you are not alone here. 💙",
        },
        ResponseRule {
            keywords: &["stressed", "overwhelmed"],
            response: "When everything piles up at once, no single step feels like enough - but one small step is still movement. This community sees how much you're carrying. What's the smallest thing that could wait until tomorrow? ✨",
        },
        ResponseRule {
            keywords: &["angry", "mad", "frustrated"],
            response: "Anger is often the loudest messenger for quieter hurts underneath. It's okay to feel it fully here without judgment. Give it some breathing room before acting on it - this space will still be listening afterwards. 💚",
        },
        ResponseRule {
            keywords: &["tired", "exhausted", "burned out"],
            response: "Carrying a heavy load for a long time is exhausting, and rest is not something that has to be earned. Be as gentle with yourself tonight as you would be with a friend who wrote this post. 🌙",
        },
        ResponseRule {
            keywords: &["thank", "grateful"],
            response: "Gratitude shared out loud lifts more people than you can see. Posts like this remind everyone here why this community matters. Keep taking care of yourself - it's clearly working. 🌟",
        },
    ],
    fallbacks: &[
        "Thank you for sharing this with the community. Your experience matters, and someone reading it today feels less alone because of it. 💚",
        "It takes real courage to put feelings into words. This is a safe space, and people here understand more than you might expect. 🤗",
        "You've been heard. Whatever today looks like, posting here was a step toward feeling better, and that counts. 🌸",
        "Many people in this community have stood where you're standing. Be patient with yourself - healing is rarely a straight line. ✨",
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn anxiety_keyword_returns_the_anxiety_response_exactly() {
        let response = COMPANION.respond("I feel so anxious about exams", &mut rng());
        assert_eq!(response, COMPANION.rules[0].response);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let upper = COMPANION.respond("ANXIETY is eating me alive", &mut rng());
        let lower = COMPANION.respond("anxiety is eating me alive", &mut rng());
        assert_eq!(upper, lower);
    }

    #[test]
    fn first_rule_in_declaration_order_wins() {
        // "sad" and "anxious" both appear; anxiety has priority.
        let response = COMPANION.respond("I'm sad and anxious at the same time", &mut rng());
        assert_eq!(response, COMPANION.rules[0].response);

        // Sadness outranks fatigue.
        let response = COMPANION.respond("feeling down and so tired", &mut rng());
        assert_eq!(response, COMPANION.rules[1].response);
    }

    #[test]
    fn unmatched_input_draws_from_the_fallback_pool() {
        let response = COMPANION.respond("what's the weather like?", &mut rng());
        assert!(COMPANION.fallbacks().contains(&response));
    }

    #[test]
    fn empty_and_whitespace_input_fall_through_to_the_pool() {
        assert!(COMPANION.fallbacks().contains(&COMPANION.respond("", &mut rng())));
        assert!(COMPANION.fallbacks().contains(&COMPANION.respond("   \t ", &mut rng())));
    }

    #[test]
    fn seeded_fallback_draw_is_reproducible() {
        let a = COMPANION.respond("hello there", &mut StdRng::seed_from_u64(42));
        let b = COMPANION.respond("hello there", &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn mentor_table_speaks_with_its_own_voice() {
        let companion = COMPANION.respond("so anxious today", &mut rng());
        let mentor = MENTOR.respond("so anxious today", &mut rng());
        assert_ne!(companion, mentor);
        assert!(mentor.contains("community"));
    }

    #[test]
    fn mentor_table_knows_its_wider_keyword_set() {
        let response = MENTOR.respond("I had a panic attack on the bus", &mut rng());
        assert_eq!(response, MENTOR.rules[0].response);
    }
}
