pub mod lobby;
/// Role preset catalog.
pub mod presets;
/// FIFO waiting queue.
pub mod queue;
/// Player registry.
pub mod roster;
/// Game sessions and role drafting.
pub mod session;
mod sse;
/// Plan, apply and abort for session phases.
pub mod state_machine;
/// Session phase transition table.
pub mod transitions;

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{models::SessionStatus, lobby_store::LobbyStore},
    error::ServiceError,
    services::{chat_listener::ChatListener, messenger::Messenger},
    state::lobby::Lobby,
};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::state_machine::{SessionEvent, SessionPhase, SessionStateMachine};

/// Handle shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;
/// Upper bound for the store commit inside a session transition.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);
const SSE_CAPACITY: usize = 64;

/// Central application state: the live lobby, its store and the outbound collaborators.
pub struct AppState {
    store: RwLock<Option<Arc<dyn LobbyStore>>>,
    lobby: RwLock<Lobby>,
    session_machine: RwLock<SessionStateMachine>,
    degraded: watch::Sender<bool>,
    /// Serialises every lobby writer.
    gate: Mutex<()>,
    /// Held for a whole role delivery run.
    dispatch: Mutex<()>,
    events: SseHub,
    messenger: Arc<dyn Messenger>,
    chat: ChatListener,
    config: AppConfig,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, messenger: Arc<dyn Messenger>, chat: ChatListener) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            lobby: RwLock::new(Lobby::new(config.queue_capacity)),
            session_machine: RwLock::new(SessionStateMachine::new()),
            degraded: degraded_tx,
            gate: Mutex::new(()),
            dispatch: Mutex::new(()),
            events: SseHub::new(SSE_CAPACITY),
            messenger,
            chat,
            config,
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Private message sink.
    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    /// Chat listener handle.
    pub fn chat(&self) -> &ChatListener {
        &self.chat
    }

    /// Broadcast hub behind `/sse/events`.
    pub fn events(&self) -> &SseHub {
        &self.events
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn LobbyStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] when none is installed or it is unhealthy.
    pub async fn require_store(&self) -> Result<Arc<dyn LobbyStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn LobbyStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.set_degraded(false);
    }

    /// Remove the current store and enter degraded mode. The live lobby keeps serving reads.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.set_degraded(true);
    }

    /// Whether storage is currently unreachable.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, returning whether it changed.
    pub fn set_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Exclusive right to deliver role cards.
    pub async fn dispatch_guard(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().await
    }

    /// Replace the live lobby with the store's snapshot and resume the session phase from it.
    pub async fn hydrate(&self) -> Result<(), ServiceError> {
        let _gate = self.gate.lock().await;
        let store = self.require_store().await?;
        let snapshot = store.load_snapshot().await?;

        let phase = match snapshot.session.as_ref().map(|session| session.status) {
            Some(SessionStatus::Active) => SessionPhase::Active,
            Some(SessionStatus::Ended) => SessionPhase::Ended,
            None => SessionPhase::Idle,
        };
        let lobby = Lobby::hydrate(snapshot, self.config.queue_capacity);
        info!(
            players = lobby.roster().len(),
            queued = lobby.queue().count(),
            presets = lobby.presets().list().len(),
            phase = phase.as_str(),
            "lobby hydrated from storage"
        );

        *self.lobby.write().await = lobby;
        *self.session_machine.write().await = SessionStateMachine::resume(phase);
        Ok(())
    }

    /// Read a projection of the live lobby.
    pub async fn read_lobby<T>(&self, read: impl FnOnce(&Lobby) -> T) -> T {
        let lobby = self.lobby.read().await;
        read(&lobby)
    }

    /// Run `change` against a draft of the lobby, persist what it recorded, then publish it.
    ///
    /// Nothing becomes visible when `change` or the store write fails.
    pub async fn mutate<T, E, F>(&self, change: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Lobby) -> Result<T, E> + Send,
        E: Into<ServiceError>,
        T: Send,
    {
        let _gate = self.gate.lock().await;
        let store = self.require_store().await?;
        self.commit(&store, change).await
    }

    /// Caller must hold `gate`.
    async fn commit<T, E, F>(&self, store: &Arc<dyn LobbyStore>, change: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Lobby) -> Result<T, E> + Send,
        E: Into<ServiceError>,
        T: Send,
    {
        let mut draft = self.lobby.read().await.clone();
        let value = change(&mut draft).map_err(Into::<ServiceError>::into)?;
        let changes = draft.take_changes();
        if !changes.is_empty() {
            store.apply(changes).await?;
        }
        *self.lobby.write().await = draft;
        Ok(value)
    }

    /// Current session phase.
    pub async fn session_phase(&self) -> SessionPhase {
        self.session_machine.read().await.phase()
    }

    /// Phase, version and pending plan of the session machine.
    pub async fn snapshot(&self) -> Snapshot {
        let sm = self.session_machine.read().await;
        sm.snapshot()
    }

    /// Plan `event`, commit `change` under the transition timeout, then apply or abort the plan.
    ///
    /// A timeout drops the pending store write; a backend without batch atomicity may keep the
    /// part it already wrote while the live lobby stays unchanged.
    pub async fn run_transition<T, E, F>(
        &self,
        event: SessionEvent,
        change: F,
    ) -> Result<(T, SessionPhase), ServiceError>
    where
        F: FnOnce(&mut Lobby) -> Result<T, E> + Send,
        E: Into<ServiceError>,
        T: Send,
    {
        let gate = self.gate.lock().await;
        let store = self.require_store().await?;
        let Plan { id: plan_id, .. } = self.session_machine.write().await.plan(event)?;

        let work = self.commit(&store, change);
        let outcome = match self.transition_timeout {
            Some(limit) => timeout(limit, work)
                .await
                .unwrap_or(Err(ServiceError::Timeout)),
            None => work.await,
        };

        match outcome {
            Ok(value) => {
                let next = self.session_machine.write().await.apply(plan_id)?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.session_machine.write().await.abort(plan_id) {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}
