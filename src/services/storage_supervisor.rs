//! Keeps the lobby store connected and the degraded flag in sync with its health.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{lobby_store::LobbyStore, storage::StorageError},
    services::sse_events::{
        broadcast_queue_updated, broadcast_session_updated, broadcast_system_status,
    },
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the storage backend, hydrate the lobby from it, and keep the shared state in
/// degraded mode whenever it is unavailable.
///
/// Every fresh connection reloads the lobby, so writes made by another instance while this
/// one was cut off are picked up.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn LobbyStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "lobby store connection attempt failed");
                backoff.wait().await;
                continue;
            }
        };

        state.install_store(store.clone()).await;
        if let Err(err) = state.hydrate().await {
            warn!(error = %err, "failed to load lobby from storage; retrying");
            state.clear_store().await;
            backoff.wait().await;
            continue;
        }
        info!("lobby store online; leaving degraded mode");
        announce(&state, false).await;
        backoff.reset();

        watch_store(&state, store.as_ref()).await;

        warn!("exhausted lobby store reconnect attempts; reconnecting from scratch");
        state.clear_store().await;
        backoff.wait().await;
    }
}

/// Poll the store until a whole recovery round fails.
async fn watch_store(state: &SharedState, store: &dyn LobbyStore) {
    loop {
        let healthy = match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "lobby store health check failed");
                recover(state, store).await
            }
        };
        if !healthy {
            return;
        }
        if state.set_degraded(false) {
            info!("lobby store healthy again; leaving degraded mode");
            announce(state, false).await;
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

/// Try to reconnect the existing store; the state turns degraded after the first miss.
async fn recover(state: &SharedState, store: &dyn LobbyStore) -> bool {
    let mut backoff = Backoff::new();
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "lobby store reconnected");
                return true;
            }
            Err(err) => {
                warn!(attempt, error = %err, "lobby store reconnect attempt failed");
                if state.set_degraded(true) {
                    warn!("entering degraded mode; lobby writes are refused");
                    announce(state, true).await;
                }
                backoff.wait().await;
            }
        }
    }
    false
}

async fn announce(state: &SharedState, degraded: bool) {
    broadcast_system_status(state, degraded);
    if !degraded {
        broadcast_queue_updated(state).await;
        broadcast_session_updated(state, state.session_phase().await).await;
    }
}

struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_DELAY,
        }
    }

    fn reset(&mut self) {
        self.delay = INITIAL_DELAY;
    }

    async fn wait(&mut self) {
        sleep(self.delay).await;
        self.delay = (self.delay * 2).min(MAX_DELAY);
    }
}
