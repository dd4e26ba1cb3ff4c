use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::{
        admin::{SessionResponse, TransitionResponse},
        validation::GameCodePath,
    },
    error::AppError,
    services::{progression_service, session_service, sse_service},
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints opening game sessions and driving their progression.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/admin/games/{code}/session",
            post(open_session).delete(close_session),
        )
        .route("/admin/games/{code}/start", post(start_game))
        .route("/admin/games/{code}/advance", post(advance_game))
        .route("/admin/games/{code}/resume", post(resume_game))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Start following a game record.
#[utoipa::path(
    post,
    path = "/admin/games/{code}/session",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Session open", body = SessionResponse),
        (status = 404, description = "Unknown game"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn open_session(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(session_service::open_session(&state, &path.code).await?))
}

/// Stop following a game record.
#[utoipa::path(
    delete,
    path = "/admin/games/{code}/session",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("code" = String, Path, description = "Join code of the game")),
    responses((status = 200, description = "Session closed", body = SessionResponse))
)]
pub async fn close_session(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Json<SessionResponse> {
    Json(session_service::close_session(&state, &path.code))
}

/// Leave the lobby and show the first question.
#[utoipa::path(
    post,
    path = "/admin/games/{code}/start",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Game started", body = TransitionResponse),
        (status = 409, description = "Game is not in the lobby or a transition is in flight")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Json<TransitionResponse>, AppError> {
    Ok(Json(progression_service::start_game(&state, &path.code).await?))
}

/// Leave the answer reveal once results are ready.
#[utoipa::path(
    post,
    path = "/admin/games/{code}/advance",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Game advanced", body = TransitionResponse),
        (status = 409, description = "Results not ready, wrong phase or a transition is in flight"),
        (status = 503, description = "Write failed or timed out")
    )
)]
pub async fn advance_game(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Json<TransitionResponse>, AppError> {
    Ok(Json(progression_service::advance_game(&state, &path.code).await?))
}

/// Leave the break screen and show the next question.
#[utoipa::path(
    post,
    path = "/admin/games/{code}/resume",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("code" = String, Path, description = "Join code of the game")),
    responses(
        (status = 200, description = "Game resumed", body = TransitionResponse),
        (status = 409, description = "Game is not on a break screen")
    )
)]
pub async fn resume_game(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<GameCodePath>>,
) -> Result<Json<TransitionResponse>, AppError> {
    Ok(Json(progression_service::resume_game(&state, &path.code).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    sse_service::verify_admin_token(&state, &provided).await?;
    Ok(next.run(req).await)
}
