//! Read models served to the presentation pages.

use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::GameEntity,
    dto::{format_system_time, phase::Screen},
    state::{reveal::RevealBoard, subscription::SubscriptionState},
};

/// Subscription state of a game as seen by the presentation pages.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStateView {
    pub game_code: String,
    /// Latest snapshot of the game record.
    pub snapshot: Option<GameEntity>,
    pub loading: bool,
    pub error: Option<String>,
    /// Screen matching the snapshot status.
    pub screen: Option<Screen>,
    pub generated_at: String,
}

impl GameStateView {
    /// Build the view from the latest subscription state.
    pub fn from_subscription(game_code: &str, state: SubscriptionState) -> Self {
        let screen = state.snapshot.as_ref().map(|game| Screen::from(game.status));
        Self {
            game_code: game_code.to_string(),
            snapshot: state.snapshot,
            loading: state.loading,
            error: state.error,
            screen,
            generated_at: format_system_time(SystemTime::now()),
        }
    }
}

/// Reveal screen content: a loading indicator until the board for the
/// current question is available.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RevealView {
    /// Reveal not reached, results not ready, or the pass has not completed.
    Loading {
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Board of the current question.
    Ready {
        board: RevealBoard,
        /// Failure of a later refresh; the board shown is the last good one.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}
