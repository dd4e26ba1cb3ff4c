pub mod reveal;
pub mod session;
mod sse;
pub mod state_machine;
pub mod subscription;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{Mutex, RwLock, watch};

use crate::{config::AppConfig, dao::game_store::GameStore, error::ServiceError};

pub use self::session::GameSession;
pub use self::sse::{AdminSseState, SseHub};

pub type SharedState = Arc<AppState>;

const ADMIN_SSE_CAPACITY: usize = 16;

/// Central application state: store handle, open game sessions and the admin stream.
pub struct AppState {
    config: Arc<AppConfig>,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    sessions: DashMap<String, Arc<GameSession>>,
    admin: AdminSseState,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config: Arc::new(config),
            game_store: RwLock::new(None),
            sessions: DashMap::new(),
            admin: AdminSseState::new(ADMIN_SSE_CAPACITY),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration shared by every session.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current game store or fail with [`ServiceError::Degraded`].
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag; returns whether the value changed.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Broadcast hub used for the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.admin.hub()
    }

    /// Token guard that ensures a single admin SSE subscriber at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        self.admin.token()
    }

    /// Session following `game_code`, if one is open.
    pub fn session(&self, game_code: &str) -> Option<Arc<GameSession>> {
        self.sessions.get(game_code).map(|entry| entry.value().clone())
    }

    /// Session following `game_code` or a not-found error.
    pub fn require_session(&self, game_code: &str) -> Result<Arc<GameSession>, ServiceError> {
        self.session(game_code)
            .ok_or_else(|| ServiceError::NotFound(format!("no open session for game `{game_code}`")))
    }

    /// Register a freshly opened session unless one already exists.
    ///
    /// Returns the registered session and whether `session` was the one inserted.
    pub fn insert_session(&self, session: Arc<GameSession>) -> (Arc<GameSession>, bool) {
        match self.sessions.entry(session.game_code().to_string()) {
            Entry::Occupied(existing) => (existing.get().clone(), false),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                (session, true)
            }
        }
    }

    /// Remove a session from the registry.
    pub fn remove_session(&self, game_code: &str) -> Option<Arc<GameSession>> {
        self.sessions.remove(game_code).map(|(_, session)| session)
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
