#[cfg(feature = "firebase-store")]
pub mod firebase;
pub mod memory;

use crate::dao::models::{GameEntity, GameUpdate, ScoreBoard, TeamAnswerResultEntity, TeamEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

/// Push feed of game record values; every item is the latest committed value
/// (`None` when the record does not exist).
pub type GameFeed = BoxStream<'static, StorageResult<Option<GameEntity>>>;

/// Abstraction over the hosted realtime database holding the game records.
pub trait GameStore: Send + Sync {
    /// Open a push subscription on the game record.
    fn watch_game(&self, game_code: &str) -> BoxFuture<'static, StorageResult<GameFeed>>;
    /// Read the game record once.
    fn fetch_game(&self, game_code: &str) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Teams registered under the game code and not marked inactive.
    fn fetch_active_teams(&self, game_code: &str)
    -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Scoring result of one team for one question; `None` when the team never answered.
    fn fetch_answer_result(
        &self,
        game_code: &str,
        question_id: &str,
        team_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<TeamAnswerResultEntity>>>;
    /// Cumulative scores of every team of the game.
    fn fetch_all_scores(&self, game_code: &str) -> BoxFuture<'static, StorageResult<ScoreBoard>>;
    /// Apply a partial update to the game record as one atomic write.
    fn apply_update(
        &self,
        game_code: &str,
        update: GameUpdate,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap round-trip used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
