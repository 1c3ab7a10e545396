//! Per-turn draw bookkeeping.
//!
//! A turn moves through three implicit states: awaiting-draw
//! (`cards_drawn == 0`), mid-turn (`cards_drawn == 1`, no locomotive), and
//! turn-complete (`cards_drawn == 2` or a face-up locomotive was taken).
//! Claiming a route is mutually exclusive with drawing and completes the
//! turn on its own.

use serde::Serialize;

/// Cards a player may draw in one turn.
pub const DRAWS_PER_TURN: u8 = 2;

/// State of the turn currently in progress.
///
/// Installed fresh by `start_turn` and replaced wholesale when the turn
/// advances; it is never handed from one player to another by mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTurn {
    /// Connection identity of the player whose turn it is
    pub player_id: String,

    /// Cards drawn so far this turn (0..=2)
    pub cards_drawn: u8,

    /// Whether a face-up locomotive was taken (ends the turn)
    pub drew_locomotive: bool,

    /// Routes claimed this turn
    pub routes_claimed: u32,
}

impl CurrentTurn {
    pub fn new(player_id: String) -> Self {
        Self {
            player_id,
            cards_drawn: 0,
            drew_locomotive: false,
            routes_claimed: 0,
        }
    }

    /// Whether this turn still has draw allowance left.
    pub fn can_draw(&self) -> bool {
        !self.drew_locomotive && self.cards_drawn < DRAWS_PER_TURN
    }

    /// A face-up locomotive is only legal as the first draw.
    ///
    /// A locomotive drawn blind from the deck carries no such restriction;
    /// it counts as an ordinary draw.
    pub fn can_draw_face_up_locomotive(&self) -> bool {
        self.cards_drawn == 0
    }

    /// Record one draw. `face_up_locomotive` forfeits the second draw.
    pub fn record_draw(&mut self, face_up_locomotive: bool) {
        self.cards_drawn += 1;
        if face_up_locomotive {
            self.drew_locomotive = true;
        }
    }

    /// Record a successful route claim.
    pub fn record_route_claim(&mut self) {
        self.routes_claimed += 1;
    }

    /// Turn is over once the allowance is spent or a face-up locomotive
    /// was taken.
    pub fn is_complete(&self) -> bool {
        self.cards_drawn >= DRAWS_PER_TURN || self.drew_locomotive
    }

    /// Check whether this turn belongs to the given connection identity.
    pub fn belongs_to(&self, player_id: &str) -> bool {
        self.player_id == player_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fresh_turn() {
        let turn = CurrentTurn::new("conn-1".to_string());
        assert_eq!(turn.cards_drawn, 0);
        assert!(!turn.drew_locomotive);
        assert_eq!(turn.routes_claimed, 0);
        assert!(turn.can_draw());
        assert!(turn.can_draw_face_up_locomotive());
        assert!(!turn.is_complete());
        assert!(turn.belongs_to("conn-1"));
        assert!(!turn.belongs_to("conn-2"));
    }

    #[test]
    fn test_two_draws_complete_turn() {
        let mut turn = CurrentTurn::new("conn-1".to_string());

        turn.record_draw(false);
        assert_eq!(turn.cards_drawn, 1);
        assert!(turn.can_draw());
        // Second draw may not be a face-up locomotive
        assert!(!turn.can_draw_face_up_locomotive());
        assert!(!turn.is_complete());

        turn.record_draw(false);
        assert_eq!(turn.cards_drawn, 2);
        assert!(!turn.can_draw());
        assert!(turn.is_complete());
    }

    #[test]
    fn test_face_up_locomotive_ends_turn() {
        let mut turn = CurrentTurn::new("conn-1".to_string());

        turn.record_draw(true);
        assert_eq!(turn.cards_drawn, 1);
        assert!(turn.drew_locomotive);
        assert!(!turn.can_draw());
        assert!(turn.is_complete());
    }

    #[test]
    fn test_route_claim_counter() {
        let mut turn = CurrentTurn::new("conn-1".to_string());
        turn.record_route_claim();
        assert_eq!(turn.routes_claimed, 1);
    }

    #[test]
    fn test_wire_format() {
        let turn = CurrentTurn::new("conn-1".to_string());
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "playerId": "conn-1",
                "cardsDrawn": 0,
                "drewLocomotive": false,
                "routesClaimed": 0
            })
        );
    }
}
