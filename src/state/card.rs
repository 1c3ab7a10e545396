//! Card and deck primitives.
//!
//! The deck is an ordered `Vec<Card>` treated as a stack: the last element
//! is the top, and cards only ever leave it by popping the tail. A card's
//! `id` is its identity for discard validation and duplicate prevention;
//! `color` is the gameplay attribute.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cards of each regular color in a fresh deck.
pub const CARDS_PER_COLOR: usize = 12;

/// Locomotives in a fresh deck.
pub const LOCOMOTIVE_COUNT: usize = 14;

/// Total cards in a fresh deck (8 colors x 12 + 14 locomotives = 108).
pub const DECK_SIZE: usize = REGULAR_COLORS.len() * CARDS_PER_COLOR + LOCOMOTIVE_COUNT;

/// Cards dealt to each player at game start.
pub const INITIAL_HAND_SIZE: usize = 4;

/// Cards visible in the face-up row.
pub const FACE_UP_COUNT: usize = 5;

/// Most locomotives allowed in the face-up row before it is redealt.
pub const MAX_FACE_UP_LOCOMOTIVES: usize = 2;

/// Card colors. `Locomotive` is the wild color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Black,
    White,
    Locomotive,
}

/// The eight non-wild colors, in deck-construction order.
pub const REGULAR_COLORS: [CardColor; 8] = [
    CardColor::Red,
    CardColor::Orange,
    CardColor::Yellow,
    CardColor::Green,
    CardColor::Blue,
    CardColor::Purple,
    CardColor::Black,
    CardColor::White,
];

impl CardColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Black => "black",
            Self::White => "white",
            Self::Locomotive => "locomotive",
        }
    }

    pub fn is_locomotive(&self) -> bool {
        matches!(self, Self::Locomotive)
    }
}

/// A single train card. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub color: CardColor,
}

impl Card {
    pub fn new(id: String, color: CardColor) -> Self {
        Self { id, color }
    }
}

/// Build the fixed 108-card deck for one room.
///
/// Ids are unique per construction (`card_1` .. `card_108`); the counter is
/// local to the call, so rooms share no mutable state.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    let mut next_id = 0u32;
    let mut mint = |color: CardColor| {
        next_id += 1;
        Card::new(format!("card_{}", next_id), color)
    };

    for color in REGULAR_COLORS {
        for _ in 0..CARDS_PER_COLOR {
            deck.push(mint(color));
        }
    }
    for _ in 0..LOCOMOTIVE_COUNT {
        deck.push(mint(CardColor::Locomotive));
    }

    deck
}

/// Fisher-Yates shuffle producing a new sequence.
pub fn shuffled<T>(cards: Vec<T>) -> Vec<T> {
    shuffled_with(cards, &mut rand::rng())
}

/// Fisher-Yates with a caller-supplied RNG (seedable in tests).
///
/// Each index is swapped with a uniformly chosen earlier-or-equal index,
/// so every permutation is equally likely.
pub fn shuffled_with<T, R: Rng>(mut cards: Vec<T>, rng: &mut R) -> Vec<T> {
    for i in (1..cards.len()).rev() {
        let j = rng.random_range(0..=i);
        cards.swap(i, j);
    }
    cards
}

/// Room code alphabet with confusable characters (0/O, 1/I) removed.
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 4;

/// Generate a short shareable room code.
///
/// Allocation (retry on collision, registry insertion) belongs to the
/// connection layer; this only picks the characters.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARS[rng.random_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_deck_composition() {
        let deck = build_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        assert_eq!(deck.len(), 108);

        let mut per_color: HashMap<CardColor, usize> = HashMap::new();
        for card in &deck {
            *per_color.entry(card.color).or_default() += 1;
        }

        for color in REGULAR_COLORS {
            assert_eq!(per_color[&color], CARDS_PER_COLOR);
        }
        assert_eq!(per_color[&CardColor::Locomotive], LOCOMOTIVE_COUNT);
    }

    #[test]
    fn test_deck_ids_unique() {
        let deck = build_deck();
        let ids: HashSet<&str> = deck.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), DECK_SIZE);
    }

    #[test]
    fn test_decks_independent() {
        // Two constructions mint the same id sequence; identity only has
        // to be unique within one room's lifetime.
        let a = build_deck();
        let b = build_deck();
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[0].id, "card_1");
        assert_eq!(a[107].id, "card_108");
    }

    #[test]
    fn test_shuffle_preserves_cards() {
        let mut rng = SmallRng::seed_from_u64(7);
        let deck = build_deck();
        let mut before: Vec<String> = deck.iter().map(|c| c.id.clone()).collect();
        let shuffled = shuffled_with(deck, &mut rng);
        let mut after: Vec<String> = shuffled.iter().map(|c| c.id.clone()).collect();

        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        let mut rng = SmallRng::seed_from_u64(7);
        let empty: Vec<u8> = shuffled_with(Vec::new(), &mut rng);
        assert!(empty.is_empty());
        assert_eq!(shuffled_with(vec![42], &mut rng), vec![42]);
    }

    #[test]
    fn test_shuffle_uniformity() {
        // All 6 permutations of a 3-element sequence should come up with
        // roughly equal frequency. 6000 trials, expected 1000 each; the
        // bounds are ~7 standard deviations wide and the RNG is seeded,
        // so this cannot flake.
        let mut rng = SmallRng::seed_from_u64(20240817);
        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();

        for _ in 0..6000 {
            let perm = shuffled_with(vec![0u8, 1, 2], &mut rng);
            *counts.entry(perm).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        for (perm, count) in counts {
            assert!(
                (800..=1200).contains(&count),
                "permutation {:?} came up {} times",
                perm,
                count
            );
        }
    }

    #[test]
    fn test_room_code_shape() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code.bytes().all(|b| ROOM_CODE_CHARS.contains(&b)));
        }
    }

    #[test]
    fn test_card_wire_format() {
        let card = Card::new("card_9".to_string(), CardColor::Locomotive);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json, serde_json::json!({"id": "card_9", "color": "locomotive"}));

        let back: Card = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }
}
