//! Library crate for quiz-night-back, exposing modules for binaries and integration tests.

/// Runtime configuration loaded from JSON.
pub mod config;
/// Storage contract, records and backends.
pub mod dao;
/// Payloads served over REST and SSE.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Business operations invoked by the routes.
pub mod services;
/// Shared application state and per-game sessions.
pub mod state;
