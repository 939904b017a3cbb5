use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::dao::models::{RegistrationLogEntity, RegistrationStatsEntity, RegistrationStatus};
use crate::dto::format_system_time;

/// One registration attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistrationLogView {
    /// Log entry identifier.
    pub id: Uuid,
    /// Matched player, when the chat identity was known.
    pub player_id: Option<Uuid>,
    /// Chat identity that sent the command.
    pub chat_id: String,
    /// Nickname known at the time, or the chat identity.
    pub nickname: String,
    /// Outcome.
    pub status: RegistrationStatus,
    /// Human-readable outcome.
    pub message: String,
    /// RFC 3339 time of the attempt.
    pub created_at: String,
}

impl From<&RegistrationLogEntity> for RegistrationLogView {
    fn from(entry: &RegistrationLogEntity) -> Self {
        Self {
            id: entry.id,
            player_id: entry.player_id,
            chat_id: entry.chat_id.clone(),
            nickname: entry.nickname.clone(),
            status: entry.status,
            message: entry.message.clone(),
            created_at: format_system_time(entry.created_at),
        }
    }
}

/// Query string of the log listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Maximum number of entries; capped by the retention window.
    pub limit: Option<usize>,
}

/// Totals since the first registration, unaffected by log retention.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationCountResponse {
    /// Attempts that queued the player.
    pub successful: u64,
    /// Attempts rejected for any other reason.
    pub failed: u64,
    /// Attempts by players already in the queue.
    pub already_queued: u64,
}

impl From<RegistrationStatsEntity> for RegistrationCountResponse {
    fn from(stats: RegistrationStatsEntity) -> Self {
        Self {
            successful: stats.successful,
            failed: stats.failed,
            already_queued: stats.already_queued,
        }
    }
}
