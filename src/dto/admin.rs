//! DTO definitions used by the admin REST API and documentation layer.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{dao::models::GameStatus, state::state_machine::Transition};

/// Result of a progression action.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionResponse {
    pub game_code: String,
    pub from: GameStatus,
    pub to: GameStatus,
    /// Present when the transition entered a new question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_ready: Option<bool>,
}

impl TransitionResponse {
    /// Describe a written transition.
    pub fn new(game_code: &str, transition: &Transition) -> Self {
        Self {
            game_code: game_code.to_string(),
            from: transition.from,
            to: transition.to,
            current_question_index: transition.update.current_question_index,
            results_ready: transition.update.results_ready,
        }
    }
}

/// Acknowledgement of a session open/close request.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub game_code: String,
    /// False when the request found the session already in the requested state.
    pub changed: bool,
}
