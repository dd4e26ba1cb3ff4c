use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        game::GameStateView,
        phase::Screen,
        sse::{
            NavigateEvent, RevealErrorEvent, ServerEvent, SnapshotEvent, SystemStatus,
            TransitionEvent,
        },
    },
    state::{SharedState, SseHub, reveal::RevealBoard, state_machine::Transition},
};

pub const EVENT_GAME_SNAPSHOT: &str = "game.snapshot";
pub const EVENT_NAVIGATE: &str = "navigate";
pub const EVENT_REVEAL_BOARD: &str = "reveal.board";
pub const EVENT_REVEAL_ERROR: &str = "reveal.error";
pub const EVENT_TRANSITION: &str = "game.transition";
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the latest subscription state of a game to its public stream.
pub fn broadcast_game_snapshot(hub: &SseHub, view: GameStateView) {
    send_event(hub, EVENT_GAME_SNAPSHOT, &SnapshotEvent(view));
}

/// Snapshot event addressed to a single subscriber instead of the whole hub.
pub fn game_snapshot_event(view: GameStateView) -> Option<ServerEvent> {
    encode_event(EVENT_GAME_SNAPSHOT, &SnapshotEvent(view))
}

/// Tell presentation pages of a game which screen to show.
pub fn broadcast_navigate(hub: &SseHub, game_code: &str, screen: Screen) {
    let payload = NavigateEvent {
        game_code: game_code.to_string(),
        screen,
    };
    send_event(hub, EVENT_NAVIGATE, &payload);
}

/// Publish a freshly aggregated reveal board.
pub fn broadcast_reveal_board(hub: &SseHub, board: &RevealBoard) {
    send_event(hub, EVENT_REVEAL_BOARD, board);
}

/// Publish the failure of a reveal aggregation pass.
pub fn broadcast_reveal_error(hub: &SseHub, game_code: &str, question_index: usize, message: &str) {
    let payload = RevealErrorEvent {
        game_code: game_code.to_string(),
        question_index,
        message: message.to_string(),
    };
    send_event(hub, EVENT_REVEAL_ERROR, &payload);
}

/// Notify the admin stream and the game's public stream of a written transition.
pub fn broadcast_transition(
    state: &SharedState,
    session_hub: &SseHub,
    game_code: &str,
    transition: &Transition,
) {
    let payload = TransitionEvent {
        game_code: game_code.to_string(),
        from: transition.from,
        to: transition.to,
        question_index: transition.update.current_question_index,
    };
    send_event(state.admin_sse(), EVENT_TRANSITION, &payload);
    send_event(session_hub, EVENT_TRANSITION, &payload);
}

/// Notify the admin stream that degraded mode was entered or left.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(state.admin_sse(), EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    if let Some(event) = encode_event(event, payload) {
        hub.broadcast(event);
    }
}

fn encode_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    ServerEvent::json(Some(event.to_string()), payload)
        .inspect_err(|err| warn!(event, error = %err, "failed to serialize SSE payload"))
        .ok()
}
