//! crates/haven_core/src/identity.rs
//!
//! Generates human-readable pseudonymous display labels for anonymous posts
//! and replies. Labels are pure functions of the supplied random source:
//! nothing is persisted, nothing ties a label back to a real identity, and
//! every call produces a fresh draw (labels are intentionally not stable
//! per user).

use rand::Rng;

const ADJECTIVES: [&str; 10] = [
    "Gentle", "Brave", "Kind", "Strong", "Peaceful", "Wise", "Caring", "Silent", "Bright", "Hope",
];

const NOUNS: [&str; 10] = [
    "River", "Mountain", "Star", "Ocean", "Moon", "Sun", "Tree", "Bird", "Butterfly", "Walker",
];

/// The two label formats required by the two feed variants. They are kept
/// distinct: the suffixed form trades readability for collision resistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    /// "Adjective Noun", e.g. "Gentle River".
    Short,
    /// "adjective_noun_NNN" with a three-digit suffix, e.g. "gentle_river_417".
    Suffixed,
}

/// Draws a display label. Adjective and noun are independent uniform draws;
/// the suffix, when present, is uniform over [100, 999).
pub fn display_label<R: Rng + ?Sized>(style: LabelStyle, rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    match style {
        LabelStyle::Short => format!("{adjective} {noun}"),
        LabelStyle::Suffixed => format!(
            "{}_{}_{}",
            adjective.to_lowercase(),
            noun.to_lowercase(),
            rng.random_range(100..999)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn short_labels_are_an_adjective_and_a_noun() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let label = display_label(LabelStyle::Short, &mut rng);
            let mut parts = label.split(' ');
            let adjective = parts.next().unwrap();
            let noun = parts.next().unwrap();
            assert!(parts.next().is_none());
            assert!(ADJECTIVES.contains(&adjective));
            assert!(NOUNS.contains(&noun));
        }
    }

    #[test]
    fn suffixed_labels_carry_a_three_digit_suffix() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let label = display_label(LabelStyle::Suffixed, &mut rng);
            let parts: Vec<&str> = label.split('_').collect();
            assert_eq!(parts.len(), 3);
            assert!(ADJECTIVES.iter().any(|a| a.to_lowercase() == parts[0]));
            assert!(NOUNS.iter().any(|n| n.to_lowercase() == parts[1]));
            let suffix: u32 = parts[2].parse().unwrap();
            assert!((100..999).contains(&suffix));
        }
    }

    #[test]
    fn labels_are_pure_in_the_random_source() {
        let a = display_label(LabelStyle::Suffixed, &mut StdRng::seed_from_u64(3));
        let b = display_label(LabelStyle::Suffixed, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
