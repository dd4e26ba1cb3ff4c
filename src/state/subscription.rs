//! Scoped subscription on a remote game record.

use std::sync::Arc;

use futures::StreamExt;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::dao::{game_store::GameStore, models::GameEntity};

/// Latest value published by a [`Subscription`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionState {
    /// Latest committed game record; `None` until the first delivery or when the record is absent.
    pub snapshot: Option<GameEntity>,
    /// True until the first delivery (or failure) arrives.
    pub loading: bool,
    /// Last feed failure, cleared by the next successful delivery.
    pub error: Option<String>,
    /// Number of snapshots delivered so far.
    pub generation: u64,
}

/// Push subscription on one game record.
///
/// Every delivery replaces the published state as the current truth. The
/// feed task owns the only sender, so once the handle is dropped or closed no
/// further values reach the receivers and their `changed()` calls return an error.
pub struct Subscription {
    task: JoinHandle<()>,
    receiver: watch::Receiver<SubscriptionState>,
}

impl Subscription {
    /// Start following `game_code` on `store`.
    pub fn open(store: Arc<dyn GameStore>, game_code: &str) -> Self {
        let (sender, receiver) = watch::channel(SubscriptionState {
            loading: true,
            ..SubscriptionState::default()
        });
        let game_code = game_code.to_string();
        let task = tokio::spawn(run_feed(store, game_code, sender));
        Self { task, receiver }
    }

    /// Receiver observing every published state.
    pub fn receiver(&self) -> watch::Receiver<SubscriptionState> {
        self.receiver.clone()
    }

    /// Latest published state.
    pub fn current(&self) -> SubscriptionState {
        self.receiver.borrow().clone()
    }

    /// Stop the feed; no update is published afterwards.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_feed(
    store: Arc<dyn GameStore>,
    game_code: String,
    sender: watch::Sender<SubscriptionState>,
) {
    let mut feed = match store.watch_game(&game_code).await {
        Ok(feed) => feed,
        Err(err) => {
            warn!(%game_code, error = %err, "failed to open game subscription");
            sender.send_modify(|state| {
                state.loading = false;
                state.error = Some(err.to_string());
            });
            return;
        }
    };

    while let Some(delivery) = feed.next().await {
        match delivery {
            Ok(snapshot) => sender.send_modify(|state| {
                state.snapshot = snapshot;
                state.loading = false;
                state.error = None;
                state.generation += 1;
            }),
            Err(err) => {
                warn!(%game_code, error = %err, "game subscription delivery failed");
                sender.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(err.to_string());
                });
            }
        }
    }

    debug!(%game_code, "game subscription feed ended");
    sender.send_modify(|state| {
        state.loading = false;
        state
            .error
            .get_or_insert_with(|| "game subscription ended".to_string());
    });
}
