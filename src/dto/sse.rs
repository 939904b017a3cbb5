use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{game::SessionView, logs::RegistrationLogView, queue::QueueEntryView},
    services::chat_listener::ChatStatus,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    /// SSE `event:` field; `None` sends an unnamed message.
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Greeting text.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether storage is unreachable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after any queue change, carrying the full ordered queue.
pub struct QueueUpdatedEvent {
    /// Number of queued players.
    pub count: usize,
    /// Queue in FIFO order.
    pub entries: Vec<QueueEntryView>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a game starts, ends or a role card is delivered.
pub struct SessionUpdatedEvent {
    /// `idle`, `active` or `ended`.
    pub phase: String,
    /// Latest session, if one was started.
    pub session: Option<SessionView>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast for every registration attempt.
pub struct RegistrationLoggedEvent(pub RegistrationLogView);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the chat listener connectivity changes.
pub struct ChatStatusEvent {
    /// New connectivity state.
    pub status: ChatStatus,
}
