use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Night Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::game_stream,
        crate::routes::sse::admin_stream,
        crate::routes::game::game_state,
        crate::routes::game::reveal_board,
        crate::routes::game::refresh_reveal,
        crate::routes::admin::open_session,
        crate::routes::admin::close_session,
        crate::routes::admin::start_game,
        crate::routes::admin::advance_game,
        crate::routes::admin::resume_game,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::GameStateView,
            crate::dto::game::RevealView,
            crate::dto::admin::SessionResponse,
            crate::dto::admin::TransitionResponse,
            crate::dto::phase::Screen,
            crate::dto::sse::AdminHandshake,
            crate::dto::sse::NavigateEvent,
            crate::dto::sse::RevealErrorEvent,
            crate::dto::sse::TransitionEvent,
            crate::dto::sse::SystemStatus,
            crate::dao::models::GameEntity,
            crate::dao::models::GameStatus,
            crate::state::reveal::RevealBoard,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "game", description = "Read models of a followed game"),
        (name = "admin", description = "Session management and game progression"),
    )
)]
pub struct ApiDoc;
