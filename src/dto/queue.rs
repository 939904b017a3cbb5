use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{queue::QueueEntry, roster::Player},
};

/// Queued player with their 1-based position.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueEntryView {
    /// 1-based position.
    pub position: usize,
    /// Queued player.
    pub player_id: Uuid,
    /// Chat identity.
    pub chat_id: String,
    /// Display name.
    pub nickname: String,
    /// Whether a role card can be delivered.
    pub has_contact: bool,
    /// RFC 3339 admission time.
    pub added_at: String,
}

impl From<(usize, &QueueEntry, &Player)> for QueueEntryView {
    fn from((position, entry, player): (usize, &QueueEntry, &Player)) -> Self {
        Self {
            position,
            player_id: player.id,
            chat_id: player.chat_id.clone(),
            nickname: player.nickname.clone(),
            has_contact: player.contact_id.is_some(),
            added_at: format_system_time(entry.added_at),
        }
    }
}

/// Manual admission of an existing player.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EnqueueRequest {
    /// Player to admit.
    pub player_id: Uuid,
}

/// Result of a manual admission.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnqueueResponse {
    /// Admitted player.
    pub player_id: Uuid,
    /// 1-based position after admission.
    pub position: usize,
}

/// Result of clearing the queue.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearQueueResponse {
    /// Number of entries removed.
    pub removed: usize,
}
