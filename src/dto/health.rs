use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of game sessions currently following a game record.
    pub open_sessions: usize,
}

impl HealthResponse {
    /// Build the payload from the degraded flag.
    pub fn new(degraded: bool, open_sessions: usize) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            open_sessions,
        }
    }
}
