//! Runtime representation of the reveal board and the rules that build it.

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    dao::{
        models::{GameEntity, QuestionEntity, ScoreBoard, TeamAnswerResultEntity, TeamEntity},
        storage::StorageError,
    },
};

/// Text shown when a multiple-choice question carries no usable answer.
pub const NO_ANSWER_TEXT: &str = "N/A";

/// Failures of a reveal aggregation pass.
#[derive(Debug, Error)]
pub enum RevealError {
    /// The current index points outside the question order.
    #[error("question index {index} is out of range ({total} questions)")]
    IndexOutOfRange {
        /// Current question index of the snapshot.
        index: usize,
        /// Length of the question order.
        total: usize,
    },
    /// The question order references a question the record does not define.
    #[error("question `{question_id}` is missing from the game record")]
    MissingQuestion {
        /// Identifier found in the question order.
        question_id: String,
    },
    /// Fetching teams, answers or scores failed.
    #[error("failed to load reveal data: {0}")]
    Storage(#[from] StorageError),
}

/// One row of the answer board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeamAnswerDisplay {
    pub team_id: String,
    pub team_name: String,
    /// Name shortened for the presentation rows.
    pub display_name: String,
    pub mascot: Option<String>,
    /// Submitted answer, or the unanswered label.
    pub selected_answer: String,
    /// `None` when the team never answered.
    pub is_correct: Option<bool>,
    pub points_awarded: i64,
    /// `-1` when the team never answered or picked no option.
    pub answer_index: i32,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RankedTeam {
    pub team_id: String,
    pub team_name: String,
    pub display_name: String,
    pub mascot: Option<String>,
    pub points: i64,
    pub rank: usize,
}

/// Everything the reveal screen shows for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RevealBoard {
    pub question_index: usize,
    pub question_id: String,
    pub question_text: String,
    pub category: String,
    pub correct_answer: String,
    pub answers: Vec<TeamAnswerDisplay>,
    pub leaderboard: Vec<RankedTeam>,
}

/// Look up the question the snapshot currently points at, with its play-order key.
pub fn current_question(game: &GameEntity) -> Result<(&str, &QuestionEntity), RevealError> {
    let index = game.current_question_index;
    let question_id = game
        .current_question_id()
        .ok_or(RevealError::IndexOutOfRange {
            index,
            total: game.question_order.len(),
        })?;

    game.questions
        .get(question_id)
        .map(|question| (question_id, question))
        .ok_or_else(|| RevealError::MissingQuestion {
            question_id: question_id.to_string(),
        })
}

/// Text of the correct answer; degrades to a placeholder instead of failing.
pub fn correct_answer_text(question: &QuestionEntity, config: &AppConfig) -> String {
    if question.category == config.free_text_category {
        return question
            .correct_answer
            .clone()
            .unwrap_or_else(|| config.missing_answer_placeholder.clone());
    }

    let from_options = question
        .options
        .as_ref()
        .zip(question.correct_answer_index)
        .and_then(|(options, index)| options.get(index).cloned());

    from_options
        .or_else(|| question.correct_answer.clone())
        .unwrap_or_else(|| NO_ANSWER_TEXT.to_string())
}

/// Normalize a team's scoring result for display.
pub fn answer_display(
    team: &TeamEntity,
    result: Option<TeamAnswerResultEntity>,
    config: &AppConfig,
) -> TeamAnswerDisplay {
    let (selected_answer, is_correct, points_awarded, answer_index) = match result {
        Some(result) => (
            result
                .selected_answer
                .unwrap_or_else(|| config.unanswered_label.clone()),
            result.is_correct,
            result.points_awarded.unwrap_or(0),
            result.answer_index.unwrap_or(-1),
        ),
        None => (config.unanswered_label.clone(), None, 0, -1),
    };

    TeamAnswerDisplay {
        team_id: team.id.clone(),
        team_name: team.name.clone(),
        display_name: truncate_name(&team.name, config.team_name_limit),
        mascot: team.mascot.clone(),
        selected_answer,
        is_correct,
        points_awarded,
        answer_index,
    }
}

/// Correct answers first, then points descending, then name.
///
/// Unanswered rows sort together with incorrect ones.
pub fn sort_answers(rows: &mut [TeamAnswerDisplay]) {
    rows.sort_by(|a, b| {
        let a_correct = a.is_correct == Some(true);
        let b_correct = b.is_correct == Some(true);
        b_correct
            .cmp(&a_correct)
            .then_with(|| b.points_awarded.cmp(&a.points_awarded))
            .then_with(|| compare_names(&a.team_name, &b.team_name))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Sort teams by cumulative score and assign ranks.
///
/// A team keeps the rank of its predecessor while its score equals the last
/// distinct score; otherwise its rank is its 1-based position.
pub fn rank_teams(teams: &[TeamEntity], scores: &ScoreBoard, config: &AppConfig) -> Vec<RankedTeam> {
    let mut scored: Vec<(&TeamEntity, i64)> = teams
        .iter()
        .map(|team| {
            let points = scores
                .get(&team.id)
                .map(|score| score.total_score)
                .unwrap_or(0);
            (team, points)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mut ranked = Vec::with_capacity(scored.len());
    let mut last_distinct: Option<i64> = None;
    let mut rank = 0;

    for (position, (team, points)) in scored.into_iter().enumerate() {
        if last_distinct != Some(points) {
            rank = position + 1;
            last_distinct = Some(points);
        }

        ranked.push(RankedTeam {
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            display_name: truncate_name(&team.name, config.team_name_limit),
            mascot: team.mascot.clone(),
            points,
            rank,
        });
    }

    ranked
}

/// Shorten `name` to `limit` characters, marking the cut with an ellipsis.
pub fn truncate_name(name: &str, limit: usize) -> String {
    let name = name.trim();
    if limit == 0 || name.chars().count() <= limit {
        return name.to_string();
    }

    let mut short: String = name.chars().take(limit.saturating_sub(1)).collect();
    short.truncate(short.trim_end().len());
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{GameStatus, TeamScoreEntity};
    use indexmap::IndexMap;

    fn team(id: &str, name: &str) -> TeamEntity {
        TeamEntity {
            id: id.into(),
            name: name.into(),
            mascot: None,
            is_active: None,
            game_code: "ABCD".into(),
        }
    }

    fn row(name: &str, is_correct: Option<bool>, points: i64) -> TeamAnswerDisplay {
        TeamAnswerDisplay {
            team_id: name.to_lowercase(),
            team_name: name.into(),
            display_name: name.into(),
            mascot: None,
            selected_answer: "x".into(),
            is_correct,
            points_awarded: points,
            answer_index: 0,
        }
    }

    fn question(category: &str) -> QuestionEntity {
        QuestionEntity {
            id: "q1".into(),
            text: "?".into(),
            category: category.into(),
            options: Some(vec!["Red".into(), "Blue".into()]),
            correct_answer_index: Some(1),
            correct_answer: Some("Blue-ish".into()),
        }
    }

    #[test]
    fn ranks_follow_last_distinct_score() {
        let config = AppConfig::default();
        let teams: Vec<_> = (0..6).map(|i| team(&format!("t{i}"), &format!("T{i}"))).collect();
        let scores: ScoreBoard = [50, 50, 30, 30, 30, 10]
            .into_iter()
            .enumerate()
            .map(|(i, total_score)| (format!("t{i}"), TeamScoreEntity { total_score }))
            .collect();

        let ranks: Vec<_> = rank_teams(&teams, &scores, &config)
            .iter()
            .map(|team| team.rank)
            .collect();
        assert_eq!(ranks, vec![1, 1, 3, 3, 3, 6]);
    }

    #[test]
    fn missing_scores_count_as_zero_and_sort_last() {
        let config = AppConfig::default();
        let teams = vec![team("a", "A"), team("b", "B")];
        let scores: ScoreBoard = [("b".to_string(), TeamScoreEntity { total_score: 5 })]
            .into_iter()
            .collect();

        let ranked = rank_teams(&teams, &scores, &config);
        assert_eq!(ranked[0].team_id, "b");
        assert_eq!((ranked[1].points, ranked[1].rank), (0, 2));
    }

    #[test]
    fn answers_sort_correct_then_points_then_name() {
        let mut rows = vec![
            row("B", Some(true), 10),
            row("A", Some(true), 10),
            row("C", Some(false), 0),
            row("D", None, 0),
        ];
        sort_answers(&mut rows);
        let names: Vec<_> = rows.iter().map(|r| r.team_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn higher_points_beat_name_order() {
        let mut rows = vec![row("Alpha", Some(true), 5), row("Zulu", Some(true), 20)];
        sort_answers(&mut rows);
        assert_eq!(rows[0].team_name, "Zulu");
    }

    #[test]
    fn unanswered_team_gets_sentinel_values() {
        let config = AppConfig::default();
        let display = answer_display(&team("t1", "Owls"), None, &config);
        assert_eq!(display.selected_answer, config.unanswered_label);
        assert_eq!(display.is_correct, None);
        assert_eq!(display.points_awarded, 0);
        assert_eq!(display.answer_index, -1);
    }

    #[test]
    fn correct_answer_resolution_paths() {
        let config = AppConfig::default();
        assert_eq!(correct_answer_text(&question("Science"), &config), "Blue");

        let mut broken = question("Science");
        broken.correct_answer_index = Some(9);
        assert_eq!(correct_answer_text(&broken, &config), "Blue-ish");
        broken.correct_answer = None;
        assert_eq!(correct_answer_text(&broken, &config), NO_ANSWER_TEXT);

        let mut free_text = question(&config.free_text_category);
        assert_eq!(correct_answer_text(&free_text, &config), "Blue-ish");
        free_text.correct_answer = None;
        assert_eq!(
            correct_answer_text(&free_text, &config),
            config.missing_answer_placeholder
        );
    }

    #[test]
    fn current_question_reports_integrity_errors() {
        let mut game = GameEntity {
            status: GameStatus::AnswerReveal,
            current_question_index: 1,
            question_order: vec!["q0".into()],
            questions: IndexMap::new(),
            results_ready: true,
        };
        assert!(matches!(
            current_question(&game),
            Err(RevealError::IndexOutOfRange { index: 1, total: 1 })
        ));

        game.current_question_index = 0;
        assert!(matches!(
            current_question(&game),
            Err(RevealError::MissingQuestion { .. })
        ));
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate_name("The Quizzy McQuizfaces", 10), "The Quizz…");
        assert_eq!(truncate_name("Owls", 10), "Owls");
        assert_eq!(truncate_name("Owls", 0), "Owls");
    }
}
