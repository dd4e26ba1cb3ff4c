use tracing::info;

use crate::{
    dto::admin::TransitionResponse,
    error::ServiceError,
    services::sse_events,
    state::{SharedState, state_machine::GameEvent},
};

/// Leave the lobby and show the first question.
pub async fn start_game(state: &SharedState, game_code: &str) -> Result<TransitionResponse, ServiceError> {
    apply_event(state, game_code, GameEvent::Start).await
}

/// Leave the reveal of the current question.
pub async fn advance_game(state: &SharedState, game_code: &str) -> Result<TransitionResponse, ServiceError> {
    apply_event(state, game_code, GameEvent::Advance).await
}

/// Leave the break screen and show the next question.
pub async fn resume_game(state: &SharedState, game_code: &str) -> Result<TransitionResponse, ServiceError> {
    apply_event(state, game_code, GameEvent::Resume).await
}

async fn apply_event(
    state: &SharedState,
    game_code: &str,
    event: GameEvent,
) -> Result<TransitionResponse, ServiceError> {
    if state.is_degraded() {
        return Err(ServiceError::Degraded);
    }

    let session = state.require_session(game_code)?;
    let transition = session.run_transition(event).await?;
    info!(%game_code, ?event, from = %transition.from, to = %transition.to, "game progressed");

    sse_events::broadcast_transition(state, session.hub(), game_code, &transition);
    Ok(TransitionResponse::new(game_code, &transition))
}
