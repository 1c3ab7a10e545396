//! Boxcar State Library
//!
//! This crate provides room session state management for Boxcar game logic.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Card Model** - The fixed 108-card deck (eight colors plus wild
//!   locomotives), unbiased shuffling, and room code generation.
//!
//! - **Room State** - One authoritative `RoomState` per room: roster in
//!   turn order, deck, five-card face-up row, discard pile, and the
//!   active turn, with every game rule enforced at the mutation site.
//!
//! - **Turn Machine** - Two draws or one face-up locomotive end a turn;
//!   route claims are only legal before any draw.
//!
//! - **Reconnection** - Players are never removed on disconnect; an
//!   opaque token rebinds a returning connection to its seat, hand, and
//!   turn.
//!
//! - **Protocol & Dispatch** - JSON envelope parsing, outbound event
//!   building, and per-intent fan-out with explicit audiences.
//!
//! # Design Principles
//!
//! 1. **Validate before mutating** - A rejected intent leaves the room
//!    exactly as it was and errors only the sender.
//!
//! 2. **Visibility is enforced here** - Hands and reconnect tokens never
//!    appear in broadcast payloads; deck draws never reveal the color.
//!
//! 3. **No networking** - This crate is pure state, no WebSocket or HTTP.
//!    The transport delivers the `Outgoing` batches it is handed.
//!
//! 4. **Randomness is injected** - Shuffles take any `rand::Rng`, so
//!    tests run deterministic decks.
//!
//! # Example
//!
//! ```rust
//! use boxcar_state::state::{dispatch, ClientIntent, RoomManager};
//!
//! let mut rooms = RoomManager::new();
//! let mut rng = rand::rng();
//!
//! let code = rooms.find_or_create("AB12");
//! rooms.bind("conn-1", &code);
//!
//! let room = rooms.get_mut(&code).unwrap();
//! let intent = ClientIntent::JoinRoom { player_name: "Alice".to_string() };
//! let outgoing = dispatch::dispatch(room, "conn-1", intent, &mut rng);
//! assert_eq!(outgoing.len(), 2);
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
