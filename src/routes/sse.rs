use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use axum_valid::Valid;
use futures::Stream;
use tracing::info;

use crate::{
    dto::validation::GameCodePath,
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/games/{code}",
    params(("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Public SSE stream of one game", content_type = "text/event-stream", body = String),
        (status = 404, description = "No open session for this game")
    )
)]
/// Stream snapshots, navigation and reveal events of one game to presentation pages.
pub async fn game_stream(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_game(&state, &path.code)?;
    info!(game_code = %path.code, "New game SSE connection");
    Ok(sse_service::to_sse_stream(
        subscription.receiver,
        subscription.snapshot,
        StreamKind::Game(path.code),
    ))
}

#[utoipa::path(
    get,
    path = "/sse/admin",
    responses((status = 200, description = "Admin SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream admin-only events, establishing or validating the admin token.
pub async fn admin_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let (receiver, token) = sse_service::subscribe_admin(&state).await?;
    info!("New admin SSE connection");
    sse_service::broadcast_admin_handshake(state.admin_sse(), &token);
    Ok(sse_service::to_sse_stream(
        receiver,
        None,
        StreamKind::Admin(state),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/games/{code}", get(game_stream))
        .route("/sse/admin", get(admin_stream))
}
