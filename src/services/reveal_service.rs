use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, models::GameEntity},
    dto::game::RevealView,
    error::ServiceError,
    services::sse_events,
    state::{
        GameSession, SharedState,
        reveal::{self, RevealBoard, RevealError},
        session::{PassTag, RevealOutcome},
    },
};

/// Build the reveal board for the question `game` currently points at.
///
/// Teams and cumulative scores are fetched together, then every team answer
/// concurrently; any failed fetch aborts the whole pass.
pub async fn aggregate(
    store: Arc<dyn GameStore>,
    config: &AppConfig,
    game_code: &str,
    game: &GameEntity,
) -> Result<RevealBoard, RevealError> {
    let (question_id, question) = reveal::current_question(game)?;
    let correct_answer = reveal::correct_answer_text(question, config);

    let (teams, scores) = tokio::try_join!(
        store.fetch_active_teams(game_code),
        store.fetch_all_scores(game_code)
    )?;

    let answer_fetches = teams
        .iter()
        .map(|team| store.fetch_answer_result(game_code, question_id, &team.id));
    let results = try_join_all(answer_fetches).await?;

    let mut answers: Vec<_> = teams
        .iter()
        .zip(results)
        .map(|(team, result)| reveal::answer_display(team, result, config))
        .collect();
    reveal::sort_answers(&mut answers);

    let leaderboard = reveal::rank_teams(&teams, &scores, config);

    Ok(RevealBoard {
        question_index: game.current_question_index,
        question_id: question_id.to_string(),
        question_text: question.text.clone(),
        category: question.category.clone(),
        correct_answer,
        answers,
        leaderboard,
    })
}

/// Run one aggregation pass for `game` and publish its outcome.
///
/// Does nothing unless the snapshot is in the reveal phase with results ready.
pub async fn run_pass(session: Arc<GameSession>, generation: u64, game: GameEntity) -> Option<RevealOutcome> {
    if !game.is_reveal_ready() {
        return None;
    }

    let tag = PassTag {
        generation,
        question_index: game.current_question_index,
    };
    debug!(game_code = %session.game_code(), ?tag, "starting reveal pass");

    let result = aggregate(session.store(), session.config(), session.game_code(), &game).await;
    let message = result.as_ref().err().map(ToString::to_string);
    let board = result.as_ref().ok().cloned();

    let outcome = session.record_reveal(tag, result).await;
    match (outcome, board, message) {
        (RevealOutcome::Stored, Some(board), _) => {
            info!(
                game_code = %session.game_code(),
                question_index = board.question_index,
                teams = board.answers.len(),
                "reveal board ready"
            );
            sse_events::broadcast_reveal_board(session.hub(), &board);
        }
        (RevealOutcome::Failed, _, Some(message)) => {
            warn!(game_code = %session.game_code(), error = %message, "reveal pass failed");
            sse_events::broadcast_reveal_error(
                session.hub(),
                session.game_code(),
                tag.question_index,
                &message,
            );
        }
        _ => {}
    }

    Some(outcome)
}

/// Reveal screen content of an open session.
pub async fn reveal_view(state: &SharedState, game_code: &str) -> Result<RevealView, ServiceError> {
    let session = state.require_session(game_code)?;
    Ok(session.reveal_view().await)
}

/// Re-run the aggregation for the current snapshot, e.g. after a failed pass.
pub async fn refresh_reveal(state: &SharedState, game_code: &str) -> Result<RevealView, ServiceError> {
    let session = state.require_session(game_code)?;
    let subscription = session.subscription_state();
    let game = subscription
        .snapshot
        .filter(GameEntity::is_reveal_ready)
        .ok_or_else(|| {
            ServiceError::InvalidState(format!("game `{game_code}` has no results to reveal"))
        })?;

    run_pass(session.clone(), subscription.generation, game).await;
    Ok(session.reveal_view().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{
        game_store::memory::MemoryGameStore,
        models::{GameStatus, QuestionEntity, TeamAnswerResultEntity, TeamEntity},
    };
    use indexmap::IndexMap;

    fn reveal_game() -> GameEntity {
        let mut questions = IndexMap::new();
        questions.insert(
            "q1".to_string(),
            QuestionEntity {
                id: "q1".into(),
                text: "Largest planet?".into(),
                category: "Space".into(),
                options: Some(vec!["Mars".into(), "Jupiter".into()]),
                correct_answer_index: Some(1),
                correct_answer: None,
            },
        );
        GameEntity {
            status: GameStatus::AnswerReveal,
            current_question_index: 0,
            question_order: vec!["q1".into()],
            questions,
            results_ready: true,
        }
    }

    fn team(id: &str, name: &str) -> TeamEntity {
        TeamEntity {
            id: id.into(),
            name: name.into(),
            mascot: None,
            is_active: Some(true),
            game_code: "QUIZ1".into(),
        }
    }

    fn answer(selected: &str, correct: bool, points: i64) -> TeamAnswerResultEntity {
        TeamAnswerResultEntity {
            selected_answer: Some(selected.into()),
            is_correct: Some(correct),
            points_awarded: Some(points),
            answer_index: Some(if correct { 1 } else { 0 }),
        }
    }

    #[tokio::test]
    async fn aggregates_answers_and_leaderboard() {
        let store = MemoryGameStore::new();
        store.put_team(team("t1", "Owls"));
        store.put_team(team("t2", "Badgers"));
        store.put_team(team("t3", "Foxes"));
        store.put_answer("QUIZ1", "q1", "t1", answer("Mars", false, 0));
        store.put_answer("QUIZ1", "q1", "t2", answer("Jupiter", true, 10));
        store.put_score("QUIZ1", "t1", 40);
        store.put_score("QUIZ1", "t2", 40);

        let board = aggregate(
            Arc::new(store),
            &AppConfig::default(),
            "QUIZ1",
            &reveal_game(),
        )
        .await
        .unwrap();

        assert_eq!(board.correct_answer, "Jupiter");
        let order: Vec<_> = board.answers.iter().map(|row| row.team_id.as_str()).collect();
        assert_eq!(order, ["t2", "t3", "t1"]);
        let unanswered = &board.answers[1];
        assert_eq!(unanswered.selected_answer, "No answer");
        assert_eq!(unanswered.is_correct, None);
        assert_eq!(unanswered.answer_index, -1);

        let ranks: Vec<_> = board
            .leaderboard
            .iter()
            .map(|row| (row.team_id.as_str(), row.rank))
            .collect();
        assert_eq!(ranks, [("t1", 1), ("t2", 1), ("t3", 3)]);
    }

    #[tokio::test]
    async fn answers_are_looked_up_by_play_order_key() {
        let store = MemoryGameStore::new();
        store.put_team(team("t1", "Owls"));
        store.put_answer("QUIZ1", "q1", "t1", answer("Jupiter", true, 10));

        let mut game = reveal_game();
        if let Some(question) = game.questions.get_mut("q1") {
            question.id.clear();
        }

        let board = aggregate(Arc::new(store), &AppConfig::default(), "QUIZ1", &game)
            .await
            .unwrap();
        assert_eq!(board.question_id, "q1");
        assert_eq!(board.answers[0].selected_answer, "Jupiter");
        assert_eq!(board.answers[0].is_correct, Some(true));
    }

    #[tokio::test]
    async fn storage_failure_aborts_the_pass() {
        let store = MemoryGameStore::new();
        store.put_team(team("t1", "Owls"));
        store.set_unavailable(true);

        let err = aggregate(
            Arc::new(store),
            &AppConfig::default(),
            "QUIZ1",
            &reveal_game(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RevealError::Storage(_)));
    }

    #[tokio::test]
    async fn missing_question_is_an_integrity_error() {
        let mut game = reveal_game();
        game.question_order = vec!["q9".into()];

        let err = aggregate(
            Arc::new(MemoryGameStore::new()),
            &AppConfig::default(),
            "QUIZ1",
            &game,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RevealError::MissingQuestion { .. }));
    }
}
