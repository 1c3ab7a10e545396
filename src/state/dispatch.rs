//! Intent dispatch.
//!
//! Translates inbound frames into room mutations and the outbound fan-out
//! each one produces. The transport layer feeds frames in with the
//! sender's connection id and delivers the returned `Outgoing` batch;
//! everything else is decided here.
//!
//! Rejections never fan out: a failed intent produces exactly one error
//! frame addressed to the sender, and the room is left untouched.

use rand::Rng;
use serde_json::json;

use crate::state::protocol::{ClientIntent, Outgoing, PlayerAction, ServerEvent};
use crate::state::room::{Phase, RoomError, RoomState};

/// Handle one raw text frame from a connection.
pub fn handle_message(
    room: &mut RoomState,
    sender: &str,
    raw: &str,
    rng: &mut impl Rng,
) -> Vec<Outgoing> {
    match ClientIntent::parse(raw) {
        Ok(intent) => dispatch(room, sender, intent, rng),
        Err(err) => {
            log::debug!("room {}: unparseable frame from {}: {}", room.room_code, sender, err);
            vec![Outgoing::to(
                sender,
                ServerEvent::Error {
                    message: err.to_string(),
                },
            )]
        }
    }
}

/// Route a parsed intent to its handler.
pub fn dispatch(
    room: &mut RoomState,
    sender: &str,
    intent: ClientIntent,
    rng: &mut impl Rng,
) -> Vec<Outgoing> {
    match intent {
        ClientIntent::JoinRoom { player_name } => handle_join(room, sender, &player_name),
        ClientIntent::RejoinRoom { reconnect_token } => {
            handle_rejoin(room, sender, &reconnect_token)
        }
        ClientIntent::StartGame => handle_start_game(room, sender, rng),
        ClientIntent::DrawFromDeck => handle_draw_from_deck(room, sender, rng),
        ClientIntent::DrawFaceUp { index } => handle_draw_face_up(room, sender, index, rng),
        ClientIntent::DiscardCards { card_ids } => handle_discard(room, sender, &card_ids),
        ClientIntent::SetTurnOrder { player_ids } => {
            handle_set_turn_order(room, sender, &player_ids)
        }
        ClientIntent::EndTurn => handle_end_turn(room, sender),
    }
}

/// Handle a connection dropping, whether or not it ever joined.
pub fn handle_disconnect(room: &mut RoomState, conn_id: &str) -> Vec<Outgoing> {
    let Some(outcome) = room.disconnect(conn_id) else {
        return Vec::new();
    };

    let mut out = vec![Outgoing::broadcast(ServerEvent::PlayerDisconnected {
        player_id: outcome.player_id,
        name: outcome.name,
    })];
    if let Some(next) = outcome.turn_passed_to {
        out.extend(turn_started(room, &next));
    }
    if room.phase == Phase::Playing {
        out.extend(game_state_events(room));
    } else {
        out.push(Outgoing::broadcast(ServerEvent::PlayerJoined {
            players: room.public_players_json(),
        }));
    }
    out
}

fn handle_join(room: &mut RoomState, sender: &str, player_name: &str) -> Vec<Outgoing> {
    let room_code = room.room_code.clone();
    let joined = match room.join(sender, player_name) {
        Ok(player) => ServerEvent::RoomCreated {
            room_code,
            player_id: player.id.clone(),
            reconnect_token: player.reconnect_token.clone(),
        },
        Err(err) => return rejected(sender, err),
    };
    vec![
        Outgoing::to(sender, joined),
        Outgoing::broadcast(ServerEvent::PlayerJoined {
            players: room.public_players_json(),
        }),
    ]
}

fn handle_rejoin(room: &mut RoomState, sender: &str, token: &str) -> Vec<Outgoing> {
    let player = match room.rejoin(token, sender) {
        Ok(player) => player.clone(),
        Err(err) => return rejected(sender, err),
    };

    let mut out = vec![
        Outgoing::to(
            sender,
            ServerEvent::RoomRejoined {
                snapshot: room.rejoin_snapshot_json(&player),
            },
        ),
        Outgoing::broadcast(ServerEvent::PlayerJoined {
            players: room.public_players_json(),
        }),
    ];
    if room.phase == Phase::Playing {
        out.extend(game_state_events(room));
    }
    out
}

fn handle_start_game(room: &mut RoomState, sender: &str, rng: &mut impl Rng) -> Vec<Outgoing> {
    if let Err(err) = room.start_game(sender, rng) {
        return rejected(sender, err);
    }

    let face_up = json!(room.face_up_cards());
    let mut out: Vec<Outgoing> = room
        .players()
        .iter()
        .filter(|p| p.connected)
        .map(|p| {
            Outgoing::to(
                &p.id,
                ServerEvent::GameStarted {
                    your_hand: json!(p.hand),
                    face_up_cards: face_up.clone(),
                },
            )
        })
        .collect();
    out.extend(game_state_events(room));
    out
}

fn handle_draw_from_deck(room: &mut RoomState, sender: &str, rng: &mut impl Rng) -> Vec<Outgoing> {
    if let Err(err) = room.draw_from_deck(sender, rng) {
        return rejected(sender, err);
    }
    let name = player_name(room, sender);

    let mut out = vec![Outgoing::except(
        sender,
        ServerEvent::PlayerAction(PlayerAction::drew_from_deck(name)),
    )];
    if let Some(next) = room.advance_if_complete() {
        out.extend(turn_started(room, &next));
    }
    out.extend(game_state_events(room));
    out
}

fn handle_draw_face_up(
    room: &mut RoomState,
    sender: &str,
    index: usize,
    rng: &mut impl Rng,
) -> Vec<Outgoing> {
    let card = match room.draw_face_up(sender, index, rng) {
        Ok(card) => card,
        Err(err) => return rejected(sender, err),
    };
    let name = player_name(room, sender);

    let mut out = vec![Outgoing::except(
        sender,
        ServerEvent::PlayerAction(PlayerAction::drew_face_up(name, card.color)),
    )];
    if let Some(next) = room.advance_if_complete() {
        out.extend(turn_started(room, &next));
    }
    out.extend(game_state_events(room));
    out
}

fn handle_discard(room: &mut RoomState, sender: &str, card_ids: &[String]) -> Vec<Outgoing> {
    let removed = match room.discard_cards(sender, card_ids) {
        Ok(removed) => removed,
        Err(err) => return rejected(sender, err),
    };
    let name = player_name(room, sender);

    let mut out = vec![Outgoing::except(
        sender,
        ServerEvent::PlayerAction(PlayerAction::discarded(name, &removed)),
    )];
    // A route claim is a complete turn.
    if let Some(next) = room.advance_turn() {
        out.extend(turn_started(room, &next));
    }
    out.extend(game_state_events(room));
    out
}

fn handle_set_turn_order(room: &mut RoomState, sender: &str, player_ids: &[String]) -> Vec<Outgoing> {
    if let Err(err) = room.set_turn_order(sender, player_ids) {
        return rejected(sender, err);
    }
    vec![Outgoing::broadcast(ServerEvent::PlayerJoined {
        players: room.public_players_json(),
    })]
}

fn handle_end_turn(room: &mut RoomState, sender: &str) -> Vec<Outgoing> {
    let next = match room.end_turn(sender) {
        Ok(next) => next,
        Err(err) => return rejected(sender, err),
    };

    let mut out = Vec::new();
    if let Some(next) = next {
        out.extend(turn_started(room, &next));
    }
    out.extend(game_state_events(room));
    out
}

/// Public snapshot to everyone plus each connected player's private hand.
fn game_state_events(room: &RoomState) -> Vec<Outgoing> {
    let mut out = vec![Outgoing::broadcast(ServerEvent::GameState {
        state: room.game_state_json(),
    })];
    for player in room.players().iter().filter(|p| p.connected) {
        out.push(Outgoing::to(
            &player.id,
            ServerEvent::YourHand {
                hand: json!(player.hand),
            },
        ));
    }
    out
}

/// Announce whose turn began, to everyone but that player.
fn turn_started(room: &RoomState, next_id: &str) -> Option<Outgoing> {
    room.player(next_id).map(|p| {
        Outgoing::except(
            next_id,
            ServerEvent::PlayerAction(PlayerAction::turn_started(p.name.clone())),
        )
    })
}

fn player_name(room: &RoomState, conn_id: &str) -> String {
    room.player(conn_id)
        .map(|p| p.name.clone())
        .unwrap_or_default()
}

fn rejected(sender: &str, err: RoomError) -> Vec<Outgoing> {
    log::debug!("rejected intent from {}: {}", sender, err);
    vec![Outgoing::to(
        sender,
        ServerEvent::Error {
            message: err.to_string(),
        },
    )]
}
