//! Game session payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::SessionStatus,
    dto::format_system_time,
    state::session::{Assignment, GameSession},
};

/// Start a game from a preset.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartGameRequest {
    /// Preset whose roles are dealt.
    pub preset_id: Uuid,
    /// Defaults to the preset's player count; any other value is rejected.
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub player_count: Option<u32>,
}

/// One dealt role card.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentView {
    /// Assignment identifier.
    pub id: Uuid,
    /// Player holding the card.
    pub player_id: Uuid,
    /// Player nickname at draft time.
    pub nickname: String,
    /// Role label.
    pub role: String,
    /// Whether the card reached the player.
    pub delivered: bool,
}

impl From<&Assignment> for AssignmentView {
    fn from(assignment: &Assignment) -> Self {
        Self {
            id: assignment.id,
            player_id: assignment.player_id,
            nickname: assignment.nickname.clone(),
            role: assignment.role.clone(),
            delivered: assignment.delivered,
        }
    }
}

/// Full game session, active or ended.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    /// Session identifier.
    pub id: Uuid,
    /// Preset the session was started from.
    pub preset_id: Uuid,
    /// Preset name at start time.
    pub preset_name: String,
    /// Active or ended.
    pub status: SessionStatus,
    /// Cards in draft order.
    pub assignments: Vec<AssignmentView>,
    /// RFC 3339 start time.
    pub created_at: String,
    /// RFC 3339 end time, once ended.
    pub ended_at: Option<String>,
}

impl From<&GameSession> for SessionView {
    fn from(session: &GameSession) -> Self {
        Self {
            id: session.id,
            preset_id: session.preset_id,
            preset_name: session.preset_name.clone(),
            status: session.status,
            assignments: session.assignments.iter().map(Into::into).collect(),
            created_at: format_system_time(session.created_at),
            ended_at: session.ended_at.map(format_system_time),
        }
    }
}

/// Assignments of the active game; empty when no game runs.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentGameResponse {
    /// Whether a game is running.
    pub active: bool,
    /// Id of the running session.
    pub session_id: Option<Uuid>,
    /// Preset name of the running session.
    pub preset_name: Option<String>,
    /// Cards of the running session.
    pub assignments: Vec<AssignmentView>,
}

impl CurrentGameResponse {
    /// Build the response from the active session, if any.
    pub fn from_active(session: Option<&GameSession>) -> Self {
        match session {
            Some(session) => Self {
                active: true,
                session_id: Some(session.id),
                preset_name: Some(session.preset_name.clone()),
                assignments: session.assignments.iter().map(Into::into).collect(),
            },
            None => Self {
                active: false,
                session_id: None,
                preset_name: None,
                assignments: Vec::new(),
            },
        }
    }
}

/// Outcome of one role delivery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DispatchReport {
    /// Sends tried during this run.
    pub attempted: usize,
    /// Sends that reached the player.
    pub delivered: usize,
    /// Sends that errored or timed out.
    pub failed: usize,
    /// Undelivered assignments whose player has no messaging contact.
    pub skipped_no_contact: usize,
}
