use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::GameStatus,
    dto::{game::GameStateView, phase::Screen},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First event of the admin stream, carrying the token required by admin routes.
pub struct AdminHandshake {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast on every delivered snapshot of the game record.
pub struct SnapshotEvent(pub GameStateView);

#[derive(Debug, Serialize, ToSchema)]
/// Tells presentation pages which screen to show.
pub struct NavigateEvent {
    pub game_code: String,
    pub screen: Screen,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a reveal aggregation pass failed; the previous board stays in place.
pub struct RevealErrorEvent {
    pub game_code: String,
    pub question_index: usize,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast to the admin stream after a transition has been written.
pub struct TransitionEvent {
    pub game_code: String,
    pub from: GameStatus,
    pub to: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
