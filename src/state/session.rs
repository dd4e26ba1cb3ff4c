//! Explicit per-game session context shared by routes, services and background tasks.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::{
    sync::{Mutex, RwLock, watch},
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dao::game_store::GameStore,
    dto::game::RevealView,
    error::ServiceError,
    state::{
        SseHub,
        reveal::{RevealBoard, RevealError},
        state_machine::{GameEvent, Plan, ProgressionMachine, Transition},
        subscription::{Subscription, SubscriptionState},
    },
};

const SESSION_SSE_CAPACITY: usize = 32;

/// Identifies the snapshot an aggregation pass was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTag {
    /// Subscription generation of the snapshot.
    pub generation: u64,
    /// Question index of the snapshot.
    pub question_index: usize,
}

/// What happened to the result of an aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The board replaced the displayed one.
    Stored,
    /// The pass failed; the displayed board was kept.
    Failed,
    /// The snapshot moved on while the pass was running; the result was dropped.
    Discarded,
}

#[derive(Debug, Default)]
struct RevealSlot {
    board: Option<RevealBoard>,
    error: Option<(usize, String)>,
    latest_generation: u64,
}

/// Everything the backend tracks for one game code.
pub struct GameSession {
    game_code: String,
    config: Arc<AppConfig>,
    store: Arc<dyn GameStore>,
    subscription: StdMutex<Option<Subscription>>,
    receiver: watch::Receiver<SubscriptionState>,
    progression: Mutex<ProgressionMachine>,
    reveal: RwLock<RevealSlot>,
    hub: SseHub,
}

impl GameSession {
    /// Open a session and start following the game record.
    pub fn open(game_code: &str, store: Arc<dyn GameStore>, config: Arc<AppConfig>) -> Arc<Self> {
        let subscription = Subscription::open(store.clone(), game_code);
        let receiver = subscription.receiver();
        let progression = ProgressionMachine::new(config.questions_per_category);

        Arc::new(Self {
            game_code: game_code.to_string(),
            config,
            store,
            subscription: StdMutex::new(Some(subscription)),
            receiver,
            progression: Mutex::new(progression),
            reveal: RwLock::new(RevealSlot::default()),
            hub: SseHub::new(SESSION_SSE_CAPACITY),
        })
    }

    /// Game code this session follows.
    pub fn game_code(&self) -> &str {
        &self.game_code
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Store the session reads from and writes to.
    pub fn store(&self) -> Arc<dyn GameStore> {
        self.store.clone()
    }

    /// Broadcast hub of the public stream of this game.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Latest subscription state.
    pub fn subscription_state(&self) -> SubscriptionState {
        self.receiver.borrow().clone()
    }

    /// Receiver notified on every subscription update.
    pub fn watch(&self) -> watch::Receiver<SubscriptionState> {
        self.receiver.clone()
    }

    /// Stop the subscription; background tasks wind down once the feed is gone.
    pub fn close(&self) {
        let subscription = self
            .subscription
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_else(|poisoned| poisoned.into_inner().take());
        if let Some(subscription) = subscription {
            subscription.close();
            info!(game_code = %self.game_code, "game session closed");
        }
    }

    /// Let the progression guard see a delivered snapshot.
    pub async fn observe_snapshot(&self, state: &SubscriptionState) {
        if let Some(snapshot) = state.snapshot.as_ref() {
            self.progression.lock().await.observe(snapshot);
        }
    }

    /// Plan `event` against the latest snapshot, write it, and settle the guard.
    ///
    /// A second call while a write is in flight fails immediately instead of queueing.
    pub async fn run_transition(&self, event: GameEvent) -> Result<Transition, ServiceError> {
        let snapshot = self.subscription_state().snapshot.ok_or_else(|| {
            ServiceError::InvalidState(format!(
                "game `{}` has no snapshot loaded yet",
                self.game_code
            ))
        })?;

        let Plan {
            id: plan_id,
            transition,
            ..
        } = self.progression.lock().await.plan(event, &snapshot)?;
        debug!(game_code = %self.game_code, %plan_id, ?event, to = %transition.to, "transition planned");

        let write = self
            .store
            .apply_update(&self.game_code, transition.update.clone());
        let outcome = match timeout(self.config.transition_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(ServiceError::from(err)),
            Err(_) => Err(ServiceError::Timeout),
        };

        let mut progression = self.progression.lock().await;
        match outcome {
            Ok(()) => {
                progression.complete(plan_id)?;
                info!(
                    game_code = %self.game_code,
                    from = %transition.from,
                    to = %transition.to,
                    "transition written"
                );
                Ok(transition)
            }
            Err(err) => {
                if let Err(abort_err) = progression.abort(plan_id) {
                    warn!(
                        game_code = %self.game_code,
                        %plan_id,
                        error = %abort_err,
                        "failed to abort transition after write error"
                    );
                }
                warn!(game_code = %self.game_code, error = %err, ?event, "transition write failed");
                Err(err)
            }
        }
    }

    /// Store the result of an aggregation pass unless the snapshot moved on.
    pub async fn record_reveal(
        &self,
        tag: PassTag,
        result: Result<RevealBoard, RevealError>,
    ) -> RevealOutcome {
        let still_current = self
            .subscription_state()
            .snapshot
            .is_some_and(|game| game.is_reveal_ready() && game.current_question_index == tag.question_index);

        let mut slot = self.reveal.write().await;
        if !still_current || tag.generation < slot.latest_generation {
            debug!(game_code = %self.game_code, ?tag, "discarding stale reveal pass");
            return RevealOutcome::Discarded;
        }
        slot.latest_generation = tag.generation;

        match result {
            Ok(board) => {
                slot.board = Some(board);
                slot.error = None;
                RevealOutcome::Stored
            }
            Err(err) => {
                slot.error = Some((tag.question_index, err.to_string()));
                RevealOutcome::Failed
            }
        }
    }

    /// Board of the current question, or loading while it is not available.
    pub async fn reveal_view(&self) -> RevealView {
        let Some(game) = self.subscription_state().snapshot else {
            return RevealView::Loading { error: None };
        };
        if !game.is_reveal_ready() {
            return RevealView::Loading { error: None };
        }

        let index = game.current_question_index;
        let slot = self.reveal.read().await;
        let error = slot
            .error
            .as_ref()
            .filter(|(question_index, _)| *question_index == index)
            .map(|(_, message)| message.clone());

        match slot.board.as_ref() {
            Some(board) if board.question_index == index => RevealView::Ready {
                board: board.clone(),
                error,
            },
            _ => RevealView::Loading { error },
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.close();
    }
}
