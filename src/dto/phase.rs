use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::models::GameStatus;

/// Screen a presentation page should show for a game status.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Waiting room with the join code.
    Lobby,
    /// Current question.
    Question,
    /// Answer reveal board.
    Reveal,
    /// Break screen between categories.
    Break,
    /// Final winners screen.
    Winners,
}

impl From<GameStatus> for Screen {
    fn from(value: GameStatus) -> Self {
        match value {
            GameStatus::Lobby => Screen::Lobby,
            GameStatus::QuestionDisplay => Screen::Question,
            GameStatus::AnswerReveal => Screen::Reveal,
            // Written at category boundaries: the break screen is next.
            GameStatus::Leaderboard | GameStatus::Break => Screen::Break,
            GameStatus::GameEnd => Screen::Winners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaderboard_status_navigates_to_break() {
        assert_eq!(Screen::from(GameStatus::Leaderboard), Screen::Break);
        assert_eq!(Screen::from(GameStatus::GameEnd), Screen::Winners);
    }
}
