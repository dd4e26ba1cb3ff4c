use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    services::sse_events,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_HEALTH_FAILURES: u32 = 3;

/// Connect to the storage backend and keep the shared state in degraded mode while it is unavailable.
///
/// Once connected, the store is polled; after repeated failed health checks
/// the connection is rebuilt through `connect` with exponential backoff.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                let mut failures = 0;
                let mut retry_delay = INITIAL_DELAY;
                while failures < MAX_HEALTH_FAILURES {
                    match store.health_check().await {
                        Ok(()) => {
                            if failures > 0 || state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.update_degraded(false);
                            }
                            failures = 0;
                            retry_delay = INITIAL_DELAY;
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(err) => {
                            if failures == 0 {
                                warn!(error = %err, "storage health check failed; entering degraded mode");
                                state.update_degraded(true);
                            } else {
                                warn!(attempt = failures, error = %err, "storage health check failed again");
                            }
                            failures += 1;
                            sleep(retry_delay).await;
                            retry_delay = (retry_delay * 2).min(MAX_DELAY);
                        }
                    }
                }

                warn!("storage kept failing health checks; reconnecting");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                state.update_degraded(true);
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Forward degraded-mode changes to the admin stream.
pub async fn publish_degraded_changes(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        sse_events::broadcast_system_status(&state, degraded);
    }
}
