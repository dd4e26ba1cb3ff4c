use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    dao::models::GameStatus,
    dto::{admin::SessionResponse, game::GameStateView, phase::Screen},
    error::ServiceError,
    services::{reveal_service, sse_events, sse_service},
    state::{GameSession, SharedState, subscription::SubscriptionState},
};

/// Open a session on `game_code` and start following its record.
///
/// Opening an already open session is a no-op reported with `changed = false`.
pub async fn open_session(state: &SharedState, game_code: &str) -> Result<SessionResponse, ServiceError> {
    if state.session(game_code).is_some() {
        return Ok(SessionResponse {
            game_code: game_code.to_string(),
            changed: false,
        });
    }

    let store = state.require_game_store().await?;
    if store.fetch_game(game_code).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_code}` does not exist")));
    }

    let session = GameSession::open(game_code, store, state.config());
    let (session, inserted) = state.insert_session(session);
    if inserted {
        tokio::spawn(react_to_snapshots(session.clone(), session.watch()));
        info!(%game_code, "game session opened");
    }

    Ok(SessionResponse {
        game_code: game_code.to_string(),
        changed: inserted,
    })
}

/// Stop following `game_code`; the public streams of the game end with it.
pub fn close_session(state: &SharedState, game_code: &str) -> SessionResponse {
    let changed = match state.remove_session(game_code) {
        Some(session) => {
            sse_service::broadcast_info(session.hub(), "game session closed");
            session.close();
            true
        }
        None => false,
    };

    SessionResponse {
        game_code: game_code.to_string(),
        changed,
    }
}

/// Latest subscription state of an open session.
pub fn game_state_view(state: &SharedState, game_code: &str) -> Result<GameStateView, ServiceError> {
    let session = state.require_session(game_code)?;
    Ok(GameStateView::from_subscription(
        game_code,
        session.subscription_state(),
    ))
}

/// Screen the presentation pages should show for `status`, if any navigation is due.
///
/// A `leaderboard` snapshot always announces the break screen, even when it
/// was already shown.
fn navigation_for(previous: Option<Screen>, status: GameStatus) -> Option<Screen> {
    let screen = Screen::from(status);
    if status == GameStatus::Leaderboard || previous != Some(screen) {
        Some(screen)
    } else {
        None
    }
}

/// Per-session reactor: publishes every delivered snapshot, navigates the
/// presentation pages and starts reveal passes.
///
/// Ends once the subscription is closed.
async fn react_to_snapshots(session: Arc<GameSession>, mut updates: watch::Receiver<SubscriptionState>) {
    let mut screen: Option<Screen> = None;

    loop {
        let current = updates.borrow_and_update().clone();
        session.observe_snapshot(&current).await;

        sse_events::broadcast_game_snapshot(
            session.hub(),
            GameStateView::from_subscription(session.game_code(), current.clone()),
        );

        if let Some(game) = current.snapshot {
            if let Some(next) = navigation_for(screen, game.status) {
                sse_events::broadcast_navigate(session.hub(), session.game_code(), next);
                screen = Some(next);
            }

            if game.is_reveal_ready() {
                tokio::spawn(reveal_service::run_pass(
                    session.clone(),
                    current.generation,
                    game,
                ));
            }
        }

        if updates.changed().await.is_err() {
            break;
        }
    }

    debug!(game_code = %session.game_code(), "session reactor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_only_fires_on_screen_changes() {
        assert_eq!(navigation_for(None, GameStatus::Lobby), Some(Screen::Lobby));
        assert_eq!(navigation_for(Some(Screen::Lobby), GameStatus::Lobby), None);
        assert_eq!(
            navigation_for(Some(Screen::Lobby), GameStatus::QuestionDisplay),
            Some(Screen::Question)
        );
    }

    #[test]
    fn leaderboard_always_navigates_to_break() {
        assert_eq!(
            navigation_for(Some(Screen::Break), GameStatus::Leaderboard),
            Some(Screen::Break)
        );
        assert_eq!(navigation_for(Some(Screen::Break), GameStatus::Break), None);
    }
}
