use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Status field of the remote game record; drives which screen is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Teams are joining, no question has been shown yet.
    Lobby,
    /// The current question is displayed and teams may answer.
    QuestionDisplay,
    /// The answer of the current question is being revealed.
    AnswerReveal,
    /// Written at a category boundary: a break screen is imminent.
    Leaderboard,
    /// Break between two categories.
    Break,
    /// Terminal state, winners are shown.
    GameEnd,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GameStatus::Lobby => "lobby",
            GameStatus::QuestionDisplay => "question_display",
            GameStatus::AnswerReveal => "answer_reveal",
            GameStatus::Leaderboard => "leaderboard",
            GameStatus::Break => "break",
            GameStatus::GameEnd => "game_end",
        };
        f.write_str(label)
    }
}

/// Question definition stored inside the game record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEntity {
    /// Stable identifier of the question; records keyed by id may omit it.
    #[serde(default)]
    pub id: String,
    /// Text displayed to the teams.
    pub text: String,
    /// Category label; the free-text category bypasses the options.
    pub category: String,
    /// Answer options for multiple-choice categories.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Index of the correct option.
    #[serde(default)]
    pub correct_answer_index: Option<usize>,
    /// Correct answer text, used directly by the free-text category.
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// One live game, as stored by the realtime database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameEntity {
    /// Current status of the game.
    pub status: GameStatus,
    /// 0-based offset into `question_order`.
    #[serde(default)]
    pub current_question_index: usize,
    /// Play order of the questions, fixed at game creation.
    #[serde(default)]
    pub question_order: Vec<String>,
    /// Questions keyed by identifier.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub questions: IndexMap<String, QuestionEntity>,
    /// Set once the scoring pass for the current question has completed.
    #[serde(default)]
    pub results_ready: bool,
}

impl GameEntity {
    /// Identifier of the current question, if the index points inside the play order.
    pub fn current_question_id(&self) -> Option<&str> {
        self.question_order
            .get(self.current_question_index)
            .map(String::as_str)
    }

    /// Whether the reveal board may be computed for this snapshot.
    pub fn is_reveal_ready(&self) -> bool {
        self.status == GameStatus::AnswerReveal && self.results_ready
    }

    /// Return a copy of the record with a partial update applied.
    pub fn with_update(mut self, update: &GameUpdate) -> Self {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(index) = update.current_question_index {
            self.current_question_index = index;
        }
        if let Some(ready) = update.results_ready {
            self.results_ready = ready;
        }
        self
    }
}

/// Partial update of the game record; only present fields are written.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    /// New status.
    pub status: Option<GameStatus>,
    /// New question index.
    pub current_question_index: Option<usize>,
    /// New readiness flag.
    pub results_ready: Option<bool>,
}

/// Team registered under a game code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamEntity {
    /// Team identifier (key of the team record).
    #[serde(default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Mascot identifier used by the frontends.
    #[serde(default)]
    pub mascot: Option<String>,
    /// Soft-delete marker; `Some(false)` excludes the team.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Game the team belongs to.
    pub game_code: String,
}

impl TeamEntity {
    /// Teams participate unless explicitly marked inactive.
    pub fn is_active(&self) -> bool {
        self.is_active != Some(false)
    }
}

/// Scoring result of one team for one question, written by the scoring pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamAnswerResultEntity {
    /// Answer text picked or typed by the team.
    #[serde(default)]
    pub selected_answer: Option<String>,
    /// Whether the answer was judged correct.
    #[serde(default)]
    pub is_correct: Option<bool>,
    /// Points awarded for this question.
    #[serde(default)]
    pub points_awarded: Option<i64>,
    /// Index of the selected option, for multiple-choice questions.
    #[serde(default)]
    pub answer_index: Option<i32>,
}

/// Cumulative score of a team.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamScoreEntity {
    /// Points accumulated over the game so far.
    #[serde(default)]
    pub total_score: i64,
}

/// Cumulative scores keyed by team identifier.
pub type ScoreBoard = HashMap<String, TeamScoreEntity>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_record_decodes_from_camel_case() {
        let raw = serde_json::json!({
            "status": "answer_reveal",
            "currentQuestionIndex": 2,
            "questionOrder": ["q1", "q2", "q3"],
            "questions": {
                "q3": {
                    "id": "q3",
                    "text": "Capital of France?",
                    "category": "Geography",
                    "options": ["Lyon", "Paris"],
                    "correctAnswerIndex": 1
                }
            },
            "resultsReady": true
        });

        let game: GameEntity = serde_json::from_value(raw).unwrap();
        assert_eq!(game.status, GameStatus::AnswerReveal);
        assert_eq!(game.current_question_id(), Some("q3"));
        assert!(game.is_reveal_ready());
    }

    #[test]
    fn question_without_inline_id_decodes() {
        let raw = serde_json::json!({
            "status": "answer_reveal",
            "currentQuestionIndex": 0,
            "questionOrder": ["q1"],
            "questions": {
                "q1": {
                    "text": "Largest planet?",
                    "category": "Space",
                    "options": ["Mars", "Jupiter"],
                    "correctAnswerIndex": 1
                }
            },
            "resultsReady": true
        });

        let game: GameEntity = serde_json::from_value(raw).unwrap();
        assert_eq!(game.current_question_id(), Some("q1"));
        assert_eq!(game.questions["q1"].id, "");
        assert_eq!(game.questions["q1"].correct_answer_index, Some(1));
    }

    #[test]
    fn missing_results_ready_defaults_to_false() {
        let raw = serde_json::json!({ "status": "answer_reveal" });
        let game: GameEntity = serde_json::from_value(raw).unwrap();
        assert!(!game.results_ready);
        assert!(!game.is_reveal_ready());
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let update = GameUpdate {
            status: Some(GameStatus::GameEnd),
            ..GameUpdate::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "game_end" }));
    }

    #[test]
    fn team_without_flag_is_active() {
        let team = TeamEntity {
            id: "t1".into(),
            name: "Owls".into(),
            mascot: None,
            is_active: None,
            game_code: "ABCD".into(),
        };
        assert!(team.is_active());
        assert!(
            !TeamEntity {
                is_active: Some(false),
                ..team
            }
            .is_active()
        );
    }
}
