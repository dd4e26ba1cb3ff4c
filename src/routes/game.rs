use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        game::{GameStateView, RevealView},
        validation::GameCodePath,
    },
    error::AppError,
    services::{reveal_service, session_service},
    state::SharedState,
};

/// Read-only routes consumed by the presentation pages.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{code}/state", get(game_state))
        .route("/games/{code}/reveal", get(reveal_board))
        .route("/games/{code}/reveal/refresh", post(refresh_reveal))
}

/// Latest snapshot of the game record with its loading/error flags.
#[utoipa::path(
    get,
    path = "/games/{code}/state",
    tag = "game",
    params(("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Subscription state", body = GameStateView),
        (status = 404, description = "No open session for this game")
    )
)]
pub async fn game_state(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(session_service::game_state_view(&state, &path.code)?))
}

/// Reveal board of the current question, or a loading marker.
#[utoipa::path(
    get,
    path = "/games/{code}/reveal",
    tag = "game",
    params(("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Reveal screen content", body = RevealView),
        (status = 404, description = "No open session for this game")
    )
)]
pub async fn reveal_board(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Json<RevealView>, AppError> {
    Ok(Json(reveal_service::reveal_view(&state, &path.code).await?))
}

/// Recompute the reveal board, e.g. after a failed aggregation.
#[utoipa::path(
    post,
    path = "/games/{code}/reveal/refresh",
    tag = "game",
    params(("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Reveal screen content after the pass", body = RevealView),
        (status = 409, description = "The game is not revealing results")
    )
)]
pub async fn refresh_reveal(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Json<RevealView>, AppError> {
    Ok(Json(reveal_service::refresh_reveal(&state, &path.code).await?))
}
