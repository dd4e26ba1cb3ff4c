use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::{
        game::GameStateView,
        sse::{AdminHandshake, ServerEvent},
    },
    error::ServiceError,
    services::sse_events,
    state::{SharedState, SseHub},
};

/// A new subscriber of a game's public stream.
pub struct GameSubscription {
    /// Current snapshot, delivered to this subscriber only before live events.
    pub snapshot: Option<ServerEvent>,
    /// Live events of the game.
    pub receiver: broadcast::Receiver<ServerEvent>,
}

/// Subscribe to the public stream of an open game session.
pub fn subscribe_game(state: &SharedState, game_code: &str) -> Result<GameSubscription, ServiceError> {
    let session = state.require_session(game_code)?;
    let receiver = session.hub().subscribe();
    let snapshot = sse_events::game_snapshot_event(GameStateView::from_subscription(
        game_code,
        session.subscription_state(),
    ));
    Ok(GameSubscription { snapshot, receiver })
}

/// Subscribe to the admin-only SSE stream.
pub async fn subscribe_admin(
    state: &SharedState,
) -> Result<(broadcast::Receiver<ServerEvent>, String), ServiceError> {
    let token = claim_admin_token(state).await?;
    let receiver = state.admin_sse().subscribe();
    Ok((receiver, token))
}

/// Identifies the target SSE stream so we can perform stream-specific
/// bookkeeping when the connection is torn down.
#[derive(Clone)]
pub enum StreamKind {
    /// Public stream of one game. It ends on its own once the session is closed.
    Game(String),
    /// Carries a clone of the shared application state so teardown logic can
    /// reset the admin token after the spawned task completes.
    Admin(SharedState),
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects. `initial` is sent before any live event.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Option<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let connected = match initial {
            Some(payload) => tx.send(Ok(to_event(payload))).await.is_ok(),
            None => true,
        };

        while connected {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "SSE subscriber lagged behind");
                            continue;
                        }
                    }
                }
            }
        }

        match kind {
            StreamKind::Game(game_code) => {
                tracing::info!(%game_code, "game SSE stream disconnected")
            }
            StreamKind::Admin(state) => {
                reset_admin_token(state).await;
                tracing::info!("Admin SSE stream disconnected")
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Reserve the admin token for a new stream, generating one when none exists
/// and failing if another connection already holds it.
async fn claim_admin_token(state: &SharedState) -> Result<String, ServiceError> {
    let mut guard = state.admin_token().lock().await;
    match &mut *guard {
        slot @ None => {
            let token = Uuid::new_v4().simple().to_string();
            slot.replace(token.clone());
            Ok(token)
        }
        Some(_) => Err(ServiceError::Unauthorized(
            "Another admin SSE stream is already active".into(),
        )),
    }
}

/// Check a token presented by an admin request against the active admin stream.
pub async fn verify_admin_token(state: &SharedState, provided: &str) -> Result<(), ServiceError> {
    let guard = state.admin_token().lock().await;
    match guard.as_deref() {
        Some(expected) if expected == provided => Ok(()),
        Some(_) => Err(ServiceError::Unauthorized("invalid admin token".into())),
        None => Err(ServiceError::Unauthorized(
            "admin SSE stream not initialised yet".into(),
        )),
    }
}

/// Broadcast a token refresh event to the admin stream.
pub fn broadcast_admin_handshake(hub: &SseHub, token: &str) {
    if let Ok(event) = ServerEvent::json(
        Some("admin_token".to_string()),
        &AdminHandshake {
            token: token.to_string(),
        },
    ) {
        hub.broadcast(event);
    }
}

/// Send a human-readable info message onto a public SSE stream.
pub fn broadcast_info(hub: &SseHub, message: &str) {
    hub.broadcast(ServerEvent::new(
        Some("info".to_string()),
        message.to_string(),
    ));
}

/// Clear any stored admin token so the next admin connection negotiates a
/// fresh credential.
async fn reset_admin_token(state: SharedState) {
    let mut guard = state.admin_token().lock().await;
    guard.take();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use indexmap::IndexMap;

    use crate::{
        config::AppConfig,
        dao::{
            game_store::memory::MemoryGameStore,
            models::{GameEntity, GameStatus},
        },
        state::{AppState, GameSession},
    };

    #[tokio::test]
    async fn single_admin_stream_owns_the_token() {
        let state = AppState::new(AppConfig::default());

        let (_receiver, token) = subscribe_admin(&state).await.unwrap();
        assert!(matches!(
            subscribe_admin(&state).await,
            Err(ServiceError::Unauthorized(_))
        ));

        assert!(verify_admin_token(&state, &token).await.is_ok());
        assert!(verify_admin_token(&state, "other").await.is_err());

        reset_admin_token(state.clone()).await;
        assert!(verify_admin_token(&state, &token).await.is_err());
        assert!(subscribe_admin(&state).await.is_ok());
    }

    #[tokio::test]
    async fn new_game_subscriber_gets_snapshot_without_rebroadcast() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryGameStore::new();
        store.put_game(
            "QUIZ1",
            GameEntity {
                status: GameStatus::Lobby,
                current_question_index: 0,
                question_order: Vec::new(),
                questions: IndexMap::new(),
                results_ready: false,
            },
        );
        let session = GameSession::open("QUIZ1", Arc::new(store), state.config());
        state.insert_session(session.clone());
        let mut existing = session.hub().subscribe();

        let subscription = subscribe_game(&state, "QUIZ1").unwrap();
        let snapshot = subscription.snapshot.unwrap();
        assert_eq!(snapshot.event.as_deref(), Some("game.snapshot"));
        assert!(matches!(
            existing.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn game_stream_requires_open_session() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            subscribe_game(&state, "QUIZ1"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
