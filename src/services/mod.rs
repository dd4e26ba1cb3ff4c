/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Admin-driven game progression.
pub mod progression_service;
/// Answer and score aggregation for the reveal screen.
pub mod reveal_service;
/// Game session lifecycle and the per-session snapshot reactor.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
