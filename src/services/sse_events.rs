use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        game::SessionView,
        logs::RegistrationLogView,
        queue::QueueEntryView,
        sse::{
            ChatStatusEvent, QueueUpdatedEvent, RegistrationLoggedEvent, ServerEvent,
            SessionUpdatedEvent, SystemStatus,
        },
    },
    services::chat_listener::ChatStatus,
    state::{SharedState, state_machine::SessionPhase},
};

/// Queue contents changed.
pub const EVENT_QUEUE_UPDATED: &str = "queue.updated";
/// Session phase or card delivery changed.
pub const EVENT_SESSION_UPDATED: &str = "session.updated";
/// A registration attempt was recorded.
pub const EVENT_REGISTRATION_LOGGED: &str = "registration.logged";
/// Chat listener connectivity changed.
pub const EVENT_CHAT_STATUS: &str = "chat.status";
/// Storage entered or left degraded mode.
pub const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast the current ordered queue.
pub async fn broadcast_queue_updated(state: &SharedState) {
    let entries: Vec<QueueEntryView> = state
        .read_lobby(|lobby| {
            lobby
                .queued_players()
                .into_iter()
                .map(QueueEntryView::from)
                .collect()
        })
        .await;
    let payload = QueueUpdatedEvent {
        count: entries.len(),
        entries,
    };
    send_event(state, EVENT_QUEUE_UPDATED, &payload);
}

/// Broadcast the session phase together with the most recent session.
pub async fn broadcast_session_updated(state: &SharedState, phase: SessionPhase) {
    let session = state
        .read_lobby(|lobby| lobby.session().map(SessionView::from))
        .await;
    let payload = SessionUpdatedEvent {
        phase: phase.as_str().to_owned(),
        session,
    };
    send_event(state, EVENT_SESSION_UPDATED, &payload);
}

/// Publish one registration attempt.
pub fn broadcast_registration_logged(state: &SharedState, entry: RegistrationLogView) {
    send_event(state, EVENT_REGISTRATION_LOGGED, &RegistrationLoggedEvent(entry));
}

/// Publish chat listener connectivity.
pub fn broadcast_chat_status(state: &SharedState, status: ChatStatus) {
    send_event(state, EVENT_CHAT_STATUS, &ChatStatusEvent { status });
}

/// Publish the degraded flag.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Relay chat listener status changes to SSE clients until the listener goes away.
pub async fn forward_chat_status(state: SharedState) {
    let mut watcher = state.chat().subscribe();
    while watcher.changed().await.is_ok() {
        let status = *watcher.borrow_and_update();
        broadcast_chat_status(&state, status);
    }
}

fn send_event<T: Serialize>(state: &SharedState, event: &str, payload: &T) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(message) => state.events().broadcast(message),
        Err(err) => warn!(event, error = %err, "failed to serialise SSE payload"),
    }
}
