//! Room state.
//!
//! One `RoomState` per active room code, exclusively owning its players,
//! deck, face-up row, discard pile, and current turn. Nothing is shared
//! across rooms. Every mutation validates fully before touching state, so
//! a rejected intent never leaves the room half-updated.
//!
//! Callers must serialize access per room (lock, actor mailbox, or a
//! single-threaded event loop); two interleaved draws against the same
//! room would otherwise pop the same top card.

use std::collections::HashSet;

use rand::Rng;

use crate::state::card::{
    build_deck, shuffled_with, Card, CardColor, FACE_UP_COUNT, INITIAL_HAND_SIZE,
    MAX_FACE_UP_LOCOMOTIVES,
};
use crate::state::player::Player;
use crate::state::turn::CurrentTurn;

/// Most players allowed in one room.
pub const MAX_PLAYERS: usize = 5;

/// Room lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Players joining, turn order negotiable
    #[default]
    Lobby,
    /// Cards dealt, turns cycling
    Playing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Playing => "playing",
        }
    }
}

/// Outcome of marking a player disconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    /// Connection identity of the player who dropped
    pub player_id: String,
    pub name: String,
    /// Player whose turn was started because the dropper held the turn
    pub turn_passed_to: Option<String>,
}

/// All state owned by one room.
#[derive(Debug, Clone)]
pub struct RoomState {
    /// Short shareable code identifying this room
    pub room_code: String,

    /// Current lifecycle phase
    pub phase: Phase,

    /// Players in turn order (also lobby display order)
    players: Vec<Player>,

    /// Draw pile; the last element is the top
    deck: Vec<Card>,

    /// Publicly visible draw options
    face_up_cards: Vec<Card>,

    discard_pile: Vec<Card>,

    current_turn: Option<CurrentTurn>,

    /// When the room was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RoomState {
    pub fn new(room_code: String) -> Self {
        Self {
            room_code,
            phase: Phase::Lobby,
            players: Vec::new(),
            deck: Vec::new(),
            face_up_cards: Vec::new(),
            discard_pile: Vec::new(),
            current_turn: None,
            created_at: chrono::Utc::now(),
        }
    }

    // --- Joining and connection lifecycle ---

    /// Add a player for a connecting identity. The first joiner becomes
    /// host; a fresh reconnect token is minted for the new player.
    pub fn join(&mut self, conn_id: &str, name: &str) -> Result<&Player, RoomError> {
        if self.phase != Phase::Lobby {
            return Err(RoomError::GameInProgress);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }
        if self.players.iter().any(|p| p.id == conn_id) {
            return Err(RoomError::AlreadyJoined);
        }

        let is_host = self.players.is_empty();
        self.players
            .push(Player::new(conn_id.to_string(), name.to_string(), is_host));

        log::info!("{} joined room {}", name, self.room_code);
        Ok(self.players.last().unwrap())
    }

    /// Resume a player's session from a reconnect token.
    ///
    /// Token possession is full proof of identity: the match is honored
    /// even if `connected` never flipped false (abrupt drops may not fire
    /// a close notification). The player's connection identity is rebound
    /// to the new connection, and the current turn follows it if it
    /// pointed at the old identity.
    pub fn rejoin(&mut self, token: &str, new_conn_id: &str) -> Result<&Player, RoomError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.reconnect_token == token)
            .ok_or(RoomError::InvalidToken)?;

        let old_id = std::mem::replace(&mut self.players[idx].id, new_conn_id.to_string());
        self.players[idx].connected = true;

        if let Some(turn) = self.current_turn.as_mut() {
            if turn.player_id == old_id {
                turn.player_id = new_conn_id.to_string();
            }
        }

        // A turn orphaned while every player was disconnected restarts
        // with the first player to come back.
        if self.phase == Phase::Playing && self.current_turn.is_none() {
            self.current_turn = Some(CurrentTurn::new(new_conn_id.to_string()));
        }

        log::info!(
            "{} rejoined room {} as {}",
            self.players[idx].name,
            self.room_code,
            new_conn_id
        );
        Ok(&self.players[idx])
    }

    /// Mark a player disconnected without removing them.
    ///
    /// If the dropper held the turn, it advances immediately to the next
    /// connected player; the current turn is never left pointing at an
    /// unreachable player.
    pub fn disconnect(&mut self, conn_id: &str) -> Option<Disconnected> {
        let idx = self.players.iter().position(|p| p.id == conn_id)?;
        self.players[idx].connected = false;
        let name = self.players[idx].name.clone();

        let held_turn = self
            .current_turn
            .as_ref()
            .is_some_and(|t| t.belongs_to(conn_id));
        let turn_passed_to = if held_turn {
            let next = self.advance_turn();
            if next.is_none() {
                self.current_turn = None;
            }
            next
        } else {
            None
        };

        log::info!("{} disconnected from room {}", name, self.room_code);
        Some(Disconnected {
            player_id: conn_id.to_string(),
            name,
            turn_passed_to,
        })
    }

    /// Reorder the roster before the game starts. Host only; the
    /// submitted ids must be an exact permutation of the current roster.
    pub fn set_turn_order(&mut self, conn_id: &str, player_ids: &[String]) -> Result<(), RoomError> {
        let sender = self.player(conn_id).ok_or(RoomError::UnknownPlayer)?;
        if !sender.is_host {
            return Err(RoomError::NotHost);
        }
        if self.phase != Phase::Lobby {
            return Err(RoomError::GameInProgress);
        }

        let unique: HashSet<&str> = player_ids.iter().map(|s| s.as_str()).collect();
        if player_ids.len() != self.players.len()
            || unique.len() != player_ids.len()
            || !self.players.iter().all(|p| unique.contains(p.id.as_str()))
        {
            return Err(RoomError::InvalidTurnOrder);
        }

        let mut reordered = Vec::with_capacity(self.players.len());
        for id in player_ids {
            if let Some(pos) = self.players.iter().position(|p| p.id == *id) {
                reordered.push(self.players.remove(pos));
            }
        }
        self.players = reordered;
        Ok(())
    }

    // --- Game start and dealing ---

    /// Deal and begin play. Host only, lobby phase only.
    pub fn start_game(&mut self, conn_id: &str, rng: &mut impl Rng) -> Result<(), RoomError> {
        let sender = self.player(conn_id).ok_or(RoomError::UnknownPlayer)?;
        if !sender.is_host {
            return Err(RoomError::NotHost);
        }
        if self.phase != Phase::Lobby {
            return Err(RoomError::GameInProgress);
        }

        self.deal_initial_hands(rng);
        self.phase = Phase::Playing;
        if let Some(first) = self.next_connected_player() {
            self.start_turn(first);
        }

        log::info!("game started in room {}", self.room_code);
        Ok(())
    }

    /// Shuffle a fresh deck, deal each player their opening hand in
    /// roster order, then fill the face-up row.
    fn deal_initial_hands(&mut self, rng: &mut impl Rng) {
        self.deck = shuffled_with(build_deck(), rng);
        for i in 0..self.players.len() {
            for _ in 0..INITIAL_HAND_SIZE {
                if let Some(card) = self.deck.pop() {
                    self.players[i].hand.push(card);
                }
            }
        }
        self.fill_face_up_row();
    }

    /// Top the face-up row up to five cards (or fewer if the deck runs
    /// out), then enforce the locomotive cap.
    fn fill_face_up_row(&mut self) {
        while self.face_up_cards.len() < FACE_UP_COUNT {
            match self.deck.pop() {
                Some(card) => self.face_up_cards.push(card),
                None => break,
            }
        }
        self.locomotive_refresh_check();
    }

    /// If the row holds more than two locomotives, discard the whole row
    /// and redeal from the deck, repeating until legal.
    ///
    /// Terminates: every redeal strictly consumes the deck, and an empty
    /// deck yields an empty (locomotive-free) row.
    fn locomotive_refresh_check(&mut self) {
        loop {
            let locomotives = self
                .face_up_cards
                .iter()
                .filter(|c| c.color.is_locomotive())
                .count();
            if locomotives <= MAX_FACE_UP_LOCOMOTIVES {
                break;
            }

            log::debug!(
                "room {}: {} locomotives face-up, redealing row",
                self.room_code,
                locomotives
            );
            self.discard_pile.append(&mut self.face_up_cards);
            for _ in 0..FACE_UP_COUNT {
                match self.deck.pop() {
                    Some(card) => self.face_up_cards.push(card),
                    None => break,
                }
            }
        }
    }

    /// When the deck is empty, the shuffled discard pile becomes the new
    /// deck. No-op while the deck still has cards.
    fn reshuffle_discard_into_deck(&mut self, rng: &mut impl Rng) {
        if !self.deck.is_empty() || self.discard_pile.is_empty() {
            return;
        }
        self.deck = shuffled_with(std::mem::take(&mut self.discard_pile), rng);
        log::debug!(
            "room {}: reshuffled {} discards into the deck",
            self.room_code,
            self.deck.len()
        );
    }

    // --- Turn machine ---

    /// Install a fresh turn for the given player.
    pub fn start_turn(&mut self, player_id: String) {
        self.current_turn = Some(CurrentTurn::new(player_id));
    }

    pub fn holds_turn(&self, player_id: &str) -> bool {
        self.current_turn
            .as_ref()
            .is_some_and(|t| t.belongs_to(player_id))
    }

    pub fn can_draw_card(&self, player_id: &str) -> bool {
        self.current_turn
            .as_ref()
            .is_some_and(|t| t.belongs_to(player_id) && t.can_draw())
    }

    pub fn can_draw_face_up_locomotive(&self, player_id: &str) -> bool {
        self.current_turn
            .as_ref()
            .is_some_and(|t| t.belongs_to(player_id) && t.can_draw_face_up_locomotive())
    }

    pub fn is_turn_complete(&self) -> bool {
        self.current_turn.as_ref().map_or(true, |t| t.is_complete())
    }

    /// Next connected player in circular roster order, skipping
    /// disconnected players entirely. With no current turn, the first
    /// connected player. `None` when nobody is connected.
    pub fn next_connected_player(&self) -> Option<String> {
        if self.players.is_empty() {
            return None;
        }
        let start = match &self.current_turn {
            None => 0,
            Some(turn) => {
                let idx = self.players.iter().position(|p| p.id == turn.player_id)?;
                idx + 1
            }
        };

        let n = self.players.len();
        (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&i| self.players[i].connected)
            .map(|i| self.players[i].id.clone())
    }

    /// Start the next connected player's turn, returning their identity.
    pub fn advance_turn(&mut self) -> Option<String> {
        let next = self.next_connected_player()?;
        self.start_turn(next.clone());
        Some(next)
    }

    /// Advance only if the current turn is finished.
    pub fn advance_if_complete(&mut self) -> Option<String> {
        if self.current_turn.is_some() && self.is_turn_complete() {
            self.advance_turn()
        } else {
            None
        }
    }

    // --- Draws ---

    /// Draw the top deck card into the player's hand, reshuffling the
    /// discard pile first if the deck is out. The drawn color stays
    /// hidden from other players.
    pub fn draw_from_deck(&mut self, conn_id: &str, rng: &mut impl Rng) -> Result<Card, RoomError> {
        if self.phase != Phase::Playing {
            return Err(RoomError::GameNotStarted);
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.id == conn_id)
            .ok_or(RoomError::UnknownPlayer)?;
        if !self.can_draw_card(conn_id) {
            return Err(self.draw_rejection(conn_id));
        }

        self.reshuffle_discard_into_deck(rng);
        let card = self.deck.pop().ok_or(RoomError::DeckExhausted)?;
        self.players[idx].hand.push(card.clone());
        if let Some(turn) = self.current_turn.as_mut() {
            turn.record_draw(false);
        }

        log::debug!(
            "room {}: {} drew from deck: {}",
            self.room_code,
            conn_id,
            card.color.as_str()
        );
        Ok(card)
    }

    /// Take a face-up card into the player's hand. A locomotive is only
    /// legal as the turn's first draw and ends the turn. The taken slot
    /// is refilled from the deck top and the row recheck runs.
    pub fn draw_face_up(
        &mut self,
        conn_id: &str,
        index: usize,
        rng: &mut impl Rng,
    ) -> Result<Card, RoomError> {
        if self.phase != Phase::Playing {
            return Err(RoomError::GameNotStarted);
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.id == conn_id)
            .ok_or(RoomError::UnknownPlayer)?;
        let target = self
            .face_up_cards
            .get(index)
            .ok_or(RoomError::InvalidCardIndex)?;
        let is_locomotive = target.color.is_locomotive();

        if is_locomotive {
            if !self.can_draw_face_up_locomotive(conn_id) {
                return Err(if self.holds_turn(conn_id) {
                    RoomError::LocomotiveFirstDrawOnly
                } else {
                    RoomError::NotYourTurn
                });
            }
        } else if !self.can_draw_card(conn_id) {
            return Err(self.draw_rejection(conn_id));
        }

        let card = self.face_up_cards.remove(index);
        self.players[idx].hand.push(card.clone());
        if let Some(replacement) = self.deck.pop() {
            self.face_up_cards.insert(index, replacement);
        }
        self.locomotive_refresh_check();

        if let Some(turn) = self.current_turn.as_mut() {
            turn.record_draw(is_locomotive);
        }
        self.reshuffle_discard_into_deck(rng);

        log::debug!(
            "room {}: {} drew face-up: {}",
            self.room_code,
            conn_id,
            card.color.as_str()
        );
        Ok(card)
    }

    fn draw_rejection(&self, conn_id: &str) -> RoomError {
        if self.holds_turn(conn_id) {
            RoomError::CannotDraw
        } else {
            RoomError::NotYourTurn
        }
    }

    // --- Route claims ---

    /// Discard cards from the player's hand to claim a route.
    ///
    /// All-or-nothing: every id must resolve against the hand and the
    /// non-locomotive colors must be identical, or nothing moves. Returns
    /// the removed cards for color-breakdown reporting. Claiming is only
    /// legal before any draw this turn.
    pub fn discard_cards(
        &mut self,
        conn_id: &str,
        card_ids: &[String],
    ) -> Result<Vec<Card>, RoomError> {
        if self.phase != Phase::Playing {
            return Err(RoomError::GameNotStarted);
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.id == conn_id)
            .ok_or(RoomError::UnknownPlayer)?;
        let turn = self.current_turn.as_ref().ok_or(RoomError::NotYourTurn)?;
        if !turn.belongs_to(conn_id) {
            return Err(RoomError::NotYourTurn);
        }
        if turn.cards_drawn > 0 {
            return Err(RoomError::RouteAfterDraw);
        }
        if card_ids.is_empty() {
            return Err(RoomError::EmptyDiscard);
        }

        // Resolve every id before mutating anything. A duplicated id
        // would double-remove, so it is rejected like a missing one.
        let mut positions = Vec::with_capacity(card_ids.len());
        for id in card_ids {
            let pos = self.players[idx]
                .hand
                .iter()
                .position(|c| c.id == *id)
                .ok_or(RoomError::CardNotInHand)?;
            if positions.contains(&pos) {
                return Err(RoomError::CardNotInHand);
            }
            positions.push(pos);
        }

        // Locomotives are wild and mix freely with one regular color.
        let mut regular: Option<CardColor> = None;
        for &pos in &positions {
            let color = self.players[idx].hand[pos].color;
            if color.is_locomotive() {
                continue;
            }
            match regular {
                None => regular = Some(color),
                Some(existing) if existing == color => {}
                Some(_) => return Err(RoomError::ColorMismatch),
            }
        }

        let mut removed = Vec::with_capacity(card_ids.len());
        for id in card_ids {
            if let Some(pos) = self.players[idx].hand.iter().position(|c| c.id == *id) {
                let card = self.players[idx].hand.remove(pos);
                removed.push(card.clone());
                self.discard_pile.push(card);
            }
        }
        if let Some(turn) = self.current_turn.as_mut() {
            turn.record_route_claim();
        }

        log::info!(
            "room {}: {} discarded {} cards",
            self.room_code,
            conn_id,
            removed.len()
        );
        Ok(removed)
    }

    /// Yield the turn voluntarily. Current player only.
    pub fn end_turn(&mut self, conn_id: &str) -> Result<Option<String>, RoomError> {
        if self.phase != Phase::Playing {
            return Err(RoomError::GameNotStarted);
        }
        if !self.holds_turn(conn_id) {
            return Err(RoomError::NotYourTurn);
        }
        Ok(self.advance_turn())
    }

    // --- Accessors ---

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, conn_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == conn_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    pub fn deck_count(&self) -> usize {
        self.deck.len()
    }

    pub fn face_up_cards(&self) -> &[Card] {
        &self.face_up_cards
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    pub fn current_turn(&self) -> Option<&CurrentTurn> {
        self.current_turn.as_ref()
    }

    // --- Projections ---

    /// Public roster in turn order; no hands, no tokens.
    pub fn public_players_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.players.iter().map(|p| p.to_public_json()).collect())
    }

    /// The broadcast `game-state` payload.
    pub fn game_state_json(&self) -> serde_json::Value {
        serde_json::json!({
            "faceUpCards": self.face_up_cards,
            "deckCount": self.deck.len(),
            "players": self.public_players_json(),
            "currentTurn": self.current_turn,
        })
    }

    /// The `room-rejoined` payload for one player: the public snapshot
    /// plus that player's own hand.
    pub fn rejoin_snapshot_json(&self, player: &Player) -> serde_json::Value {
        serde_json::json!({
            "playerId": player.id,
            "hand": player.hand,
            "faceUpCards": self.face_up_cards,
            "deckCount": self.deck.len(),
            "players": self.public_players_json(),
            "currentTurn": self.current_turn,
            "phase": self.phase.as_str(),
        })
    }
}

/// Room errors. Every rejection is local to the sender and leaves the
/// room unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    GameInProgress,
    GameNotStarted,
    RoomFull,
    AlreadyJoined,
    NotHost,
    NotYourTurn,
    CannotDraw,
    LocomotiveFirstDrawOnly,
    InvalidCardIndex,
    DeckExhausted,
    EmptyDiscard,
    CardNotInHand,
    ColorMismatch,
    RouteAfterDraw,
    UnknownPlayer,
    InvalidToken,
    InvalidTurnOrder,
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GameInProgress => write!(f, "Game already in progress"),
            Self::GameNotStarted => write!(f, "Game has not started"),
            Self::RoomFull => write!(f, "Room is full (max {} players)", MAX_PLAYERS),
            Self::AlreadyJoined => write!(f, "Already joined this room"),
            Self::NotHost => write!(f, "Only the host can do that"),
            Self::NotYourTurn => write!(f, "It's not your turn"),
            Self::CannotDraw => write!(f, "Cannot draw a card right now"),
            Self::LocomotiveFirstDrawOnly => {
                write!(f, "Can only draw a face-up locomotive as your first draw")
            }
            Self::InvalidCardIndex => write!(f, "Invalid card index"),
            Self::DeckExhausted => write!(f, "No cards left in deck"),
            Self::EmptyDiscard => write!(f, "No cards selected to discard"),
            Self::CardNotInHand => write!(f, "Card not found in hand"),
            Self::ColorMismatch => {
                write!(f, "Discarded cards must be a single color plus locomotives")
            }
            Self::RouteAfterDraw => write!(f, "Cannot claim a route after drawing cards"),
            Self::UnknownPlayer => write!(f, "No such player in this room"),
            Self::InvalidToken => write!(f, "Invalid reconnect token"),
            Self::InvalidTurnOrder => write!(f, "Turn order must list each player exactly once"),
        }
    }
}

impl std::error::Error for RoomError {}
