//! In-process game store backed by concurrent maps and watch channels.
//!
//! Used when no realtime database is configured and by the test-suite, where
//! its knobs (write latency, simulated outage) stand in for network behaviour.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use futures::{FutureExt, StreamExt, future::BoxFuture};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::dao::{
    game_store::{GameFeed, GameStore},
    models::{GameEntity, GameUpdate, ScoreBoard, TeamAnswerResultEntity, TeamEntity},
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct Inner {
    games: DashMap<String, watch::Sender<Option<GameEntity>>>,
    teams: DashMap<String, TeamEntity>,
    answers: DashMap<(String, String, String), TeamAnswerResultEntity>,
    scores: DashMap<String, ScoreBoard>,
    unavailable: AtomicBool,
    update_latency_ms: AtomicU64,
    applied_updates: AtomicUsize,
}

/// Game store keeping every record in memory.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<Inner>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a game record, notifying subscribers.
    pub fn put_game(&self, game_code: &str, game: GameEntity) {
        self.channel(game_code).send_replace(Some(game));
    }

    /// Insert or replace a team record.
    pub fn put_team(&self, team: TeamEntity) {
        self.inner.teams.insert(team.id.clone(), team);
    }

    /// Record the scoring result of a team for a question.
    pub fn put_answer(
        &self,
        game_code: &str,
        question_id: &str,
        team_id: &str,
        result: TeamAnswerResultEntity,
    ) {
        self.inner.answers.insert(
            (game_code.into(), question_id.into(), team_id.into()),
            result,
        );
    }

    /// Set the cumulative score of a team.
    pub fn put_score(&self, game_code: &str, team_id: &str, total_score: i64) {
        self.inner
            .scores
            .entry(game_code.into())
            .or_default()
            .insert(team_id.into(), crate::dao::models::TeamScoreEntity { total_score });
    }

    /// Current value of a game record.
    pub fn game(&self, game_code: &str) -> Option<GameEntity> {
        self.inner
            .games
            .get(game_code)
            .and_then(|sender| sender.borrow().clone())
    }

    /// Simulate an outage: every operation fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay applied to every write before it lands.
    pub fn set_update_latency(&self, latency: Duration) {
        self.inner
            .update_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of partial updates applied so far.
    pub fn applied_updates(&self) -> usize {
        self.inner.applied_updates.load(Ordering::SeqCst)
    }

    fn channel(&self, game_code: &str) -> watch::Sender<Option<GameEntity>> {
        self.inner
            .games
            .entry(game_code.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .clone()
    }

    fn check_available(inner: &Inner, operation: &str) -> StorageResult<()> {
        if inner.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                format!("{operation} failed"),
                io::Error::new(io::ErrorKind::NotConnected, "memory store offline"),
            ));
        }
        Ok(())
    }
}

impl GameStore for MemoryGameStore {
    fn watch_game(&self, game_code: &str) -> BoxFuture<'static, StorageResult<GameFeed>> {
        let inner = self.inner.clone();
        let receiver = self.channel(game_code).subscribe();
        async move {
            Self::check_available(&inner, "watch game")?;
            let feed: GameFeed = WatchStream::new(receiver).map(Ok).boxed();
            Ok(feed)
        }
        .boxed()
    }

    fn fetch_game(&self, game_code: &str) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        let game_code = game_code.to_string();
        async move {
            Self::check_available(&store.inner, "fetch game")?;
            Ok(store.game(&game_code))
        }
        .boxed()
    }

    fn fetch_active_teams(
        &self,
        game_code: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let inner = self.inner.clone();
        let game_code = game_code.to_string();
        async move {
            Self::check_available(&inner, "fetch teams")?;
            let mut teams: Vec<TeamEntity> = inner
                .teams
                .iter()
                .filter(|entry| entry.game_code == game_code && entry.is_active())
                .map(|entry| entry.value().clone())
                .collect();
            teams.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(teams)
        }
        .boxed()
    }

    fn fetch_answer_result(
        &self,
        game_code: &str,
        question_id: &str,
        team_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<TeamAnswerResultEntity>>> {
        let inner = self.inner.clone();
        let key = (game_code.to_string(), question_id.to_string(), team_id.to_string());
        async move {
            Self::check_available(&inner, "fetch answer")?;
            Ok(inner.answers.get(&key).map(|entry| entry.value().clone()))
        }
        .boxed()
    }

    fn fetch_all_scores(&self, game_code: &str) -> BoxFuture<'static, StorageResult<ScoreBoard>> {
        let inner = self.inner.clone();
        let game_code = game_code.to_string();
        async move {
            Self::check_available(&inner, "fetch scores")?;
            Ok(inner
                .scores
                .get(&game_code)
                .map(|entry| entry.value().clone())
                .unwrap_or_default())
        }
        .boxed()
    }

    fn apply_update(
        &self,
        game_code: &str,
        update: GameUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let sender = self.channel(game_code);
        let game_code = game_code.to_string();
        async move {
            let latency = inner.update_latency_ms.load(Ordering::SeqCst);
            if latency > 0 {
                tokio::time::sleep(Duration::from_millis(latency)).await;
            }
            Self::check_available(&inner, "apply update")?;

            let applied = sender.send_if_modified(|current| match current.take() {
                Some(game) => {
                    *current = Some(game.with_update(&update));
                    true
                }
                None => false,
            });
            if !applied {
                return Err(StorageError::malformed(
                    format!("games/{game_code}"),
                    "cannot update a missing game record",
                ));
            }
            inner.applied_updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        async move { Self::check_available(&inner, "health check") }.boxed()
    }
}
