//! Wire protocol.
//!
//! Every message in either direction is a JSON envelope of
//! `{"type": "...", "payload": {...}}` with kebab-case type names and
//! camelCase payload fields. `ClientIntent` deserializes inbound
//! envelopes; `ServerEvent` serializes outbound ones. `Outgoing` pairs
//! an event with the audience it should reach, so the transport layer
//! only has to map recipients to sockets.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::card::{Card, CardColor};

/// Parsed client request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientIntent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { player_name: String },
    #[serde(rename_all = "camelCase")]
    RejoinRoom { reconnect_token: String },
    StartGame,
    DrawFromDeck,
    #[serde(rename_all = "camelCase")]
    DrawFaceUp { index: usize },
    #[serde(rename_all = "camelCase")]
    DiscardCards { card_ids: Vec<String> },
    #[serde(rename_all = "camelCase")]
    SetTurnOrder { player_ids: Vec<String> },
    EndTurn,
}

impl ClientIntent {
    /// Every intent's wire name, for telling an unknown type apart from
    /// a malformed envelope.
    const TYPE_NAMES: [&'static str; 8] = [
        "join-room",
        "rejoin-room",
        "start-game",
        "draw-from-deck",
        "draw-face-up",
        "discard-cards",
        "set-turn-order",
        "end-turn",
    ];

    /// Parse one inbound text frame. Payload-free intents may arrive
    /// with `"payload": {}` or `null`; those are stripped so the unit
    /// variants deserialize from a missing content field.
    pub fn parse(raw: &str) -> Result<Self, IntentError> {
        let mut value: Value =
            serde_json::from_str(raw).map_err(|_| IntentError::Malformed)?;
        if let Some(envelope) = value.as_object_mut() {
            let empty = match envelope.get("payload") {
                Some(Value::Null) => true,
                Some(Value::Object(map)) => map.is_empty(),
                _ => false,
            };
            if empty {
                envelope.remove("payload");
            }
        }

        // A well-formed envelope naming a type nobody speaks is reported
        // as such; anything else that fails to deserialize is malformed.
        if let Some(t) = value.get("type").and_then(Value::as_str) {
            if !Self::TYPE_NAMES.contains(&t) {
                return Err(IntentError::UnknownType);
            }
        }
        serde_json::from_value(value).map_err(|_| IntentError::Malformed)
    }
}

/// Why an inbound frame could not become an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentError {
    /// Not JSON, no envelope, or a payload that does not fit the type
    Malformed,
    /// A well-formed envelope with a type nobody speaks
    UnknownType,
}

impl std::fmt::Display for IntentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => write!(f, "Invalid message format"),
            Self::UnknownType => write!(f, "Unknown message type"),
        }
    }
}

impl std::error::Error for IntentError {}

/// What another player did, reported to everyone except the actor.
/// Deck draws never reveal the drawn color; face-up draws do, since the
/// card was already public.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAction {
    pub kind: PlayerActionKind,
    pub player_name: String,
    /// Color taken, face-up draws only
    pub card_color: Option<CardColor>,
    /// Cards spent, discards only
    pub count: Option<usize>,
    /// Per-color totals of the discard, discards only
    pub color_breakdown: Option<BTreeMap<CardColor, usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerActionKind {
    DrewFromDeck,
    DrewFaceUp,
    Discarded,
    TurnStarted,
}

impl PlayerActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DrewFromDeck => "drew-from-deck",
            Self::DrewFaceUp => "drew-face-up",
            Self::Discarded => "discarded",
            Self::TurnStarted => "turn-started",
        }
    }
}

impl PlayerAction {
    pub fn drew_from_deck(player_name: String) -> Self {
        Self {
            kind: PlayerActionKind::DrewFromDeck,
            player_name,
            card_color: None,
            count: None,
            color_breakdown: None,
        }
    }

    pub fn drew_face_up(player_name: String, color: CardColor) -> Self {
        Self {
            kind: PlayerActionKind::DrewFaceUp,
            player_name,
            card_color: Some(color),
            count: None,
            color_breakdown: None,
        }
    }

    pub fn discarded(player_name: String, cards: &[Card]) -> Self {
        let mut breakdown: BTreeMap<CardColor, usize> = BTreeMap::new();
        for card in cards {
            *breakdown.entry(card.color).or_insert(0) += 1;
        }
        Self {
            kind: PlayerActionKind::Discarded,
            player_name,
            card_color: None,
            count: Some(cards.len()),
            color_breakdown: Some(breakdown),
        }
    }

    pub fn turn_started(player_name: String) -> Self {
        Self {
            kind: PlayerActionKind::TurnStarted,
            player_name,
            card_color: None,
            count: None,
            color_breakdown: None,
        }
    }

    /// Payload with the optional fields present only when meaningful.
    /// The discriminator rides inside the payload as `type`, same as the
    /// envelope's own tag; clients switch on it to format the action.
    pub fn to_json(&self) -> Value {
        let mut payload = json!({
            "type": self.kind.as_str(),
            "playerName": self.player_name,
        });
        let fields = payload.as_object_mut().unwrap();
        if let Some(color) = self.card_color {
            fields.insert("cardColor".to_string(), json!(color));
        }
        if let Some(count) = self.count {
            fields.insert("count".to_string(), json!(count));
        }
        if let Some(breakdown) = &self.color_breakdown {
            let by_color: serde_json::Map<String, Value> = breakdown
                .iter()
                .map(|(color, n)| (color.as_str().to_string(), json!(n)))
                .collect();
            fields.insert("colorBreakdown".to_string(), Value::Object(by_color));
        }
        payload
    }
}

/// Outbound event, one per envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Join acknowledged: identity, room code, and reconnect token for
    /// the joining player alone
    RoomCreated {
        room_code: String,
        player_id: String,
        reconnect_token: String,
    },
    /// Full state snapshot after a successful rejoin
    RoomRejoined { snapshot: Value },
    /// Roster changed (join, rejoin, reorder, disconnect)
    PlayerJoined { players: Value },
    PlayerDisconnected { player_id: String, name: String },
    /// Game began; hand is private to the addressed player
    GameStarted { your_hand: Value, face_up_cards: Value },
    /// Public room snapshot
    GameState { state: Value },
    /// The addressed player's private hand
    YourHand { hand: Value },
    PlayerAction(PlayerAction),
    Error { message: String },
}

impl ServerEvent {
    fn type_name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "room-created",
            Self::RoomRejoined { .. } => "room-rejoined",
            Self::PlayerJoined { .. } => "player-joined",
            Self::PlayerDisconnected { .. } => "player-disconnected",
            Self::GameStarted { .. } => "game-started",
            Self::GameState { .. } => "game-state",
            Self::YourHand { .. } => "your-hand",
            Self::PlayerAction(_) => "player-action",
            Self::Error { .. } => "error",
        }
    }

    fn payload(&self) -> Value {
        match self {
            Self::RoomCreated {
                room_code,
                player_id,
                reconnect_token,
            } => json!({
                "roomCode": room_code,
                "playerId": player_id,
                "reconnectToken": reconnect_token,
            }),
            Self::RoomRejoined { snapshot } => snapshot.clone(),
            Self::PlayerJoined { players } => json!({ "players": players }),
            Self::PlayerDisconnected { player_id, name } => json!({
                "playerId": player_id,
                "name": name,
            }),
            Self::GameStarted {
                your_hand,
                face_up_cards,
            } => json!({
                "yourHand": your_hand,
                "faceUpCards": face_up_cards,
            }),
            Self::GameState { state } => state.clone(),
            Self::YourHand { hand } => json!({ "hand": hand }),
            Self::PlayerAction(action) => action.to_json(),
            Self::Error { message } => json!({ "message": message }),
        }
    }

    /// The full envelope.
    pub fn to_json(&self) -> Value {
        json!({
            "type": self.type_name(),
            "payload": self.payload(),
        })
    }

    /// Envelope serialized to one text frame.
    pub fn to_text(&self) -> String {
        self.to_json().to_string()
    }
}

/// Audience for one outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected player in the room
    Broadcast,
    /// Every connected player except one connection
    Exclude(String),
    /// A single connection
    To(String),
}

/// An event with its audience, ready for the transport to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub recipient: Recipient,
    pub event: ServerEvent,
}

impl Outgoing {
    pub fn broadcast(event: ServerEvent) -> Self {
        Self {
            recipient: Recipient::Broadcast,
            event,
        }
    }

    pub fn except(conn_id: &str, event: ServerEvent) -> Self {
        Self {
            recipient: Recipient::Exclude(conn_id.to_string()),
            event,
        }
    }

    pub fn to(conn_id: &str, event: ServerEvent) -> Self {
        Self {
            recipient: Recipient::To(conn_id.to_string()),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::card::build_deck;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_join_room() {
        let raw = r#"{"type":"join-room","payload":{"playerName":"Ada"}}"#;
        let intent = ClientIntent::parse(raw).unwrap();
        assert_eq!(
            intent,
            ClientIntent::JoinRoom {
                player_name: "Ada".to_string()
            }
        );
    }

    #[test]
    fn test_parse_draw_face_up() {
        let raw = r#"{"type":"draw-face-up","payload":{"index":2}}"#;
        let intent = ClientIntent::parse(raw).unwrap();
        assert_eq!(intent, ClientIntent::DrawFaceUp { index: 2 });
    }

    #[test]
    fn test_parse_unit_variant_without_payload() {
        let intent = ClientIntent::parse(r#"{"type":"end-turn"}"#).unwrap();
        assert_eq!(intent, ClientIntent::EndTurn);

        let intent = ClientIntent::parse(r#"{"type":"draw-from-deck","payload":{}}"#).unwrap();
        assert_eq!(intent, ClientIntent::DrawFromDeck);

        let intent = ClientIntent::parse(r#"{"type":"start-game","payload":null}"#).unwrap();
        assert_eq!(intent, ClientIntent::StartGame);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            ClientIntent::parse("not json").unwrap_err(),
            IntentError::Malformed
        );
        assert_eq!(
            ClientIntent::parse(r#"{"type":"join-room","payload":{}}"#).unwrap_err(),
            IntentError::Malformed
        );
        assert_eq!(
            ClientIntent::parse(r#"{"payload":{"index":1}}"#).unwrap_err(),
            IntentError::Malformed
        );
    }

    #[test]
    fn test_parse_distinguishes_unknown_type() {
        assert_eq!(
            ClientIntent::parse(r#"{"type":"no-such-intent"}"#).unwrap_err(),
            IntentError::UnknownType
        );
        assert_eq!(IntentError::UnknownType.to_string(), "Unknown message type");
        assert_eq!(IntentError::Malformed.to_string(), "Invalid message format");
    }

    #[test]
    fn test_envelope_shape() {
        let event = ServerEvent::Error {
            message: "It's not your turn".to_string(),
        };
        let json = event.to_json();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["message"], "It's not your turn");
    }

    #[test]
    fn test_deck_draw_action_hides_color() {
        let action = PlayerAction::drew_from_deck("Ada".to_string());
        let json = action.to_json();
        assert_eq!(json["type"], "drew-from-deck");
        assert_eq!(json["playerName"], "Ada");
        assert!(json.get("cardColor").is_none());
    }

    #[test]
    fn test_face_up_action_reveals_color() {
        let action = PlayerAction::drew_face_up("Ada".to_string(), CardColor::Blue);
        let json = action.to_json();
        assert_eq!(json["type"], "drew-face-up");
        assert_eq!(json["cardColor"], "blue");
    }

    #[test]
    fn test_discard_action_breakdown() {
        let mut deck = build_deck();
        let locomotive = deck.pop().unwrap();
        let red_a = deck.remove(0);
        let red_b = deck.remove(0);
        let action = PlayerAction::discarded("Ada".to_string(), &[red_a, red_b, locomotive]);

        let json = action.to_json();
        assert_eq!(json["type"], "discarded");
        assert_eq!(json["count"], 3);
        assert_eq!(json["colorBreakdown"]["red"], 2);
        assert_eq!(json["colorBreakdown"]["locomotive"], 1);
    }

    #[test]
    fn test_action_envelope_tags() {
        // Clients switch on the inner `type` to format the action; the
        // outer envelope keeps its own tag.
        let event =
            ServerEvent::PlayerAction(PlayerAction::turn_started("Ada".to_string()));
        let json = event.to_json();
        assert_eq!(json["type"], "player-action");
        assert_eq!(json["payload"]["type"], "turn-started");
        assert_eq!(json["payload"]["playerName"], "Ada");
    }

    #[test]
    fn test_recipient_constructors() {
        let event = ServerEvent::Error {
            message: "x".to_string(),
        };
        assert_eq!(
            Outgoing::except("conn-1", event.clone()).recipient,
            Recipient::Exclude("conn-1".to_string())
        );
        assert_eq!(
            Outgoing::to("conn-1", event.clone()).recipient,
            Recipient::To("conn-1".to_string())
        );
        assert_eq!(Outgoing::broadcast(event).recipient, Recipient::Broadcast);
    }
}
