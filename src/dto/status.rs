use serde::Serialize;
use utoipa::ToSchema;

use crate::services::chat_listener::ChatStatus;

/// Dashboard overview of the moving parts.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatusResponse {
    /// `connected` or `degraded`.
    pub db: String,
    /// Chat listener state.
    pub chat: ChatStatus,
    /// Channel being listened to.
    pub chat_channel: Option<String>,
    /// Whether the messaging bot can send.
    pub bot: bool,
    /// Players waiting.
    pub queue_length: usize,
    /// `idle`, `active` or `ended`.
    pub session_phase: String,
}
