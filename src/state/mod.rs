//! Room session state.
//!
//! - `card` - Card and deck model, shuffling, room codes
//! - `player` - Per-player record: hand, host flag, reconnect token
//! - `turn` - Draw/claim accounting for the active turn
//! - `room` - One room's authoritative state and every rule check
//! - `protocol` - Wire envelopes in and out, fan-out recipients
//! - `dispatch` - Intent routing: frame in, outbound batch out
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RoomManager                           │
//! │                                                              │
//! │  room_code → RoomState          conn_id → room_code          │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                 RoomState (per room)                   │  │
//! │  │                                                        │  │
//! │  │  players: Vec<Player>   (turn order, hands, tokens)    │  │
//! │  │  deck / face_up_cards / discard_pile: Vec<Card>        │  │
//! │  │  current_turn: Option<CurrentTurn>                     │  │
//! │  │                                                        │  │
//! │  │  Lobby ──start_game──▶ Playing                         │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport layer owns sockets; this crate owns rules. A frame
//! arrives, `dispatch::handle_message` mutates the addressed room and
//! returns `Outgoing` events tagged with their audience, and the
//! transport delivers them.
//!
//! # Usage
//!
//! ```rust,ignore
//! use boxcar_state::state::{dispatch, RoomManager};
//!
//! let mut rooms = RoomManager::new();
//! let code = rooms.find_or_create("AB12");
//! rooms.bind("conn-1", &code);
//!
//! let mut rng = rand::rng();
//! if let Some(room) = rooms.get_mut(&code) {
//!     let outgoing = dispatch::handle_message(room, "conn-1", frame, &mut rng);
//!     // deliver `outgoing` per recipient
//! }
//! ```

use std::collections::HashMap;

pub mod card;
pub mod dispatch;
pub mod player;
pub mod protocol;
pub mod room;
pub mod turn;

// Re-export commonly used types
pub use card::{generate_room_code, Card, CardColor, DECK_SIZE, FACE_UP_COUNT, INITIAL_HAND_SIZE};
pub use player::Player;
pub use protocol::{ClientIntent, IntentError, Outgoing, PlayerAction, Recipient, ServerEvent};
pub use room::{Disconnected, Phase, RoomError, RoomState, MAX_PLAYERS};
pub use turn::CurrentTurn;

/// All active rooms plus the connection-to-room index the transport
/// needs to route frames and disconnects.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<String, RoomState>,
    /// conn_id → room_code, maintained by bind/unbind
    conn_index: HashMap<String, String>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the room for a code. Codes are case-insensitive
    /// on the wire and stored uppercased. Returns the normalized code.
    pub fn find_or_create(&mut self, room_code: &str) -> String {
        let code = room_code.to_uppercase();
        self.rooms
            .entry(code.clone())
            .or_insert_with(|| RoomState::new(code.clone()));
        code
    }

    pub fn get(&self, room_code: &str) -> Option<&RoomState> {
        self.rooms.get(&room_code.to_uppercase())
    }

    pub fn get_mut(&mut self, room_code: &str) -> Option<&mut RoomState> {
        self.rooms.get_mut(&room_code.to_uppercase())
    }

    /// Remember which room a connection belongs to.
    pub fn bind(&mut self, conn_id: &str, room_code: &str) {
        self.conn_index
            .insert(conn_id.to_string(), room_code.to_uppercase());
    }

    /// Forget a connection, returning the room it was bound to.
    pub fn unbind(&mut self, conn_id: &str) -> Option<String> {
        self.conn_index.remove(conn_id)
    }

    pub fn room_code_for(&self, conn_id: &str) -> Option<&String> {
        self.conn_index.get(conn_id)
    }

    /// Drop a room and every connection binding pointing at it.
    pub fn remove(&mut self, room_code: &str) -> Option<RoomState> {
        let code = room_code.to_uppercase();
        self.conn_index.retain(|_, bound| *bound != code);
        self.rooms.remove(&code)
    }

    /// Drop rooms nobody is connected to anymore. Reconnect tokens for
    /// removed rooms are gone with them; callers decide the grace period
    /// by choosing when to run this.
    pub fn cleanup_abandoned(&mut self) -> Vec<String> {
        let abandoned: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.connected_count() == 0 && room.player_count() > 0)
            .map(|(code, _)| code.clone())
            .collect();
        for code in &abandoned {
            log::info!("removing abandoned room {}", code);
            self.remove(code);
        }
        abandoned
    }

    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_find_or_create_normalizes_code() {
        let mut rooms = RoomManager::new();
        let code = rooms.find_or_create("ab12");
        assert_eq!(code, "AB12");
        assert_eq!(rooms.count(), 1);

        // Same room regardless of casing.
        rooms.find_or_create("Ab12");
        assert_eq!(rooms.count(), 1);
        assert!(rooms.get("aB12").is_some());
    }

    #[test]
    fn test_bind_and_unbind() {
        let mut rooms = RoomManager::new();
        rooms.find_or_create("AB12");
        rooms.bind("conn-1", "ab12");

        assert_eq!(rooms.room_code_for("conn-1"), Some(&"AB12".to_string()));
        assert_eq!(rooms.unbind("conn-1"), Some("AB12".to_string()));
        assert_eq!(rooms.room_code_for("conn-1"), None);
    }

    #[test]
    fn test_remove_purges_bindings() {
        let mut rooms = RoomManager::new();
        rooms.find_or_create("AB12");
        rooms.bind("conn-1", "AB12");
        rooms.bind("conn-2", "AB12");

        assert!(rooms.remove("AB12").is_some());
        assert_eq!(rooms.room_code_for("conn-1"), None);
        assert_eq!(rooms.room_code_for("conn-2"), None);
        assert_eq!(rooms.count(), 0);
    }

    #[test]
    fn test_cleanup_abandoned() {
        let mut rooms = RoomManager::new();

        // A room whose only player disconnected.
        rooms.find_or_create("DEAD");
        let room = rooms.get_mut("DEAD").unwrap();
        room.join("conn-1", "Ada").unwrap();
        room.disconnect("conn-1");

        // A live room and an empty never-joined room both survive.
        rooms.find_or_create("LIVE");
        rooms.get_mut("LIVE").unwrap().join("conn-2", "Grace").unwrap();
        rooms.find_or_create("FRSH");

        let removed = rooms.cleanup_abandoned();
        assert_eq!(removed, vec!["DEAD".to_string()]);
        assert!(rooms.get("DEAD").is_none());
        assert!(rooms.get("LIVE").is_some());
        assert!(rooms.get("FRSH").is_some());
    }
}
