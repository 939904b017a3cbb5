use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Registered viewer able to join the waiting queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Identity on the live-chat platform (unique, immutable once set).
    pub chat_id: String,
    /// Display nickname.
    pub nickname: String,
    /// Private messaging contact used to deliver role cards.
    pub contact_id: Option<String>,
    /// Optional phone number kept for the admins.
    pub phone: Option<String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Membership of a player in the waiting queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntryEntity {
    /// Queued player.
    pub player_id: Uuid,
    /// Strictly increasing insertion key defining FIFO order.
    pub sequence: u64,
    /// Time the player joined the queue.
    pub added_at: SystemTime,
}

/// Named template of roles for a fixed number of players.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolePresetEntity {
    /// Stable identifier for the preset.
    pub id: Uuid,
    /// Unique preset name.
    pub name: String,
    /// Number of players the preset is designed for.
    pub player_count: u32,
    /// Role labels, `roles.len() == player_count`.
    pub roles: Vec<String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Lifecycle status of a persisted game session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Roles are being played.
    Active,
    /// Game finished; kept for history.
    Ended,
}

/// One drafted player bound to one role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentEntity {
    /// Stable identifier for the assignment.
    pub id: Uuid,
    /// Drafted player.
    pub player_id: Uuid,
    /// Nickname captured at draft time.
    pub nickname: String,
    /// Role label drawn from the session roles.
    pub role: String,
    /// Whether the role card reached the player.
    pub delivered: bool,
}

/// Game session with its captured roles and assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Preset the session was started from.
    pub preset_id: Uuid,
    /// Preset name captured at start.
    pub preset_name: String,
    /// Roles captured at start, decoupled from later preset deletion.
    pub roles: Vec<String>,
    /// Current status.
    pub status: SessionStatus,
    /// Drafted players and their roles, in draft order.
    pub assignments: Vec<AssignmentEntity>,
    /// Start timestamp.
    pub created_at: SystemTime,
    /// End timestamp, set when the session is ended.
    pub ended_at: Option<SystemTime>,
}

/// Outcome tag of a registration attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Player was queued.
    Success,
    /// Attempt was rejected.
    Failed,
    /// Player was already waiting.
    AlreadyQueued,
}

/// Immutable audit record of one registration attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationLogEntity {
    /// Entry identifier.
    pub id: Uuid,
    /// Resolved player, absent when the chat identity is unknown.
    pub player_id: Option<Uuid>,
    /// Raw chat identity that sent the command.
    pub chat_id: String,
    /// Nickname of the resolved player, or the chat identity when unknown.
    pub nickname: String,
    /// Outcome.
    pub status: RegistrationStatus,
    /// Human readable outcome.
    pub message: String,
    /// Time of the attempt.
    pub created_at: SystemTime,
}

/// Aggregated registration outcome counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationStatsEntity {
    /// Successful registrations.
    pub successful: u64,
    /// Failed registrations.
    pub failed: u64,
    /// Attempts by already queued players.
    pub already_queued: u64,
}

impl RegistrationStatsEntity {
    /// Count one more log entry with the given status.
    pub fn record(&mut self, status: RegistrationStatus) {
        match status {
            RegistrationStatus::Success => self.successful += 1,
            RegistrationStatus::Failed => self.failed += 1,
            RegistrationStatus::AlreadyQueued => self.already_queued += 1,
        }
    }
}
