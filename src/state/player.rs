//! Player records.
//!
//! One `Player` per human participant, created at join time and kept for
//! the life of the room even while disconnected. The `id` field names the
//! live connection currently representing the player; it is re-pointed on
//! every successful rejoin.

use crate::state::card::Card;
use uuid::Uuid;

/// A participant in a room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Current connection identity (rebound on reconnect)
    pub id: String,

    /// Display name
    pub name: String,

    /// Hidden hand; delivered only to this player's own connection
    pub hand: Vec<Card>,

    /// Whether this player is the room host
    pub is_host: bool,

    /// Opaque credential for resuming the session; handed back only to
    /// this client at join time
    pub reconnect_token: String,

    /// Whether a live connection currently represents this player
    pub connected: bool,

    /// When the player joined the room
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl Player {
    /// Create a player bound to a fresh connection, minting a new
    /// reconnect token.
    pub fn new(id: String, name: String, is_host: bool) -> Self {
        Self {
            id,
            name,
            hand: Vec::new(),
            is_host,
            reconnect_token: Uuid::new_v4().to_string(),
            connected: true,
            joined_at: chrono::Utc::now(),
        }
    }

    pub fn card_count(&self) -> usize {
        self.hand.len()
    }

    pub fn has_card(&self, card_id: &str) -> bool {
        self.hand.iter().any(|c| c.id == card_id)
    }

    /// Public projection sent to every client.
    ///
    /// Never includes hand contents or the reconnect token.
    pub fn to_public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "isHost": self.is_host,
            "cardCount": self.hand.len(),
            "connected": self.connected,
        })
    }
}
