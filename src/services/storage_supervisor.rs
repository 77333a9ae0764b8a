use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{hunt_store::HuntStore, storage::StorageError},
    services::{sse_events, tournament_service},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn HuntStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_hunt_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                on_recovered(&state).await;
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.set_degraded(false) {
                                info!("storage healthy again; leaving degraded mode");
                                on_recovered(&state).await;
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(err) => {
                            warn!(error = %err, "storage health check failed");
                            if reconnect(&state, store.as_ref()).await {
                                if state.set_degraded(false) {
                                    on_recovered(&state).await;
                                }
                                sleep(HEALTH_POLL_INTERVAL).await;
                            } else {
                                warn!("exhausted storage reconnect attempts; staying in degraded mode");
                                state.clear_hunt_store().await;
                                break;
                            }
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Bounded reconnect loop on the existing handle. Enters degraded mode after the first failure.
async fn reconnect(state: &SharedState, store: &dyn HuntStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    if state.set_degraded(true) {
                        sse_events::broadcast_system_status(state, true);
                    }
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}

/// Re-seed the lifecycle from storage and tell clients the backend is healthy again.
async fn on_recovered(state: &SharedState) {
    match tournament_service::sync_lifecycle(state).await {
        Ok(metadata) => info!(
            tournament_id = %metadata.active_tournament_id,
            is_started = metadata.is_started,
            "tournament state loaded from storage"
        ),
        Err(err) => warn!(error = %err, "failed to load tournament metadata"),
    }
    sse_events::broadcast_system_status(state, false);
}
