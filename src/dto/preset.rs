use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_role_labels},
    state::presets::RolePreset,
};

/// Stored role preset.
#[derive(Debug, Serialize, ToSchema)]
pub struct PresetView {
    /// Preset identifier.
    pub id: Uuid,
    /// Unique preset name.
    pub name: String,
    /// Seats at the table.
    pub player_count: u32,
    /// Role labels, one per seat.
    pub roles: Vec<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<&RolePreset> for PresetView {
    fn from(preset: &RolePreset) -> Self {
        Self {
            id: preset.id,
            name: preset.name.clone(),
            player_count: preset.player_count,
            roles: preset.roles.clone(),
            created_at: format_system_time(preset.created_at),
        }
    }
}

/// New role preset. `player_count` defaults to the number of roles and must match it when given.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePresetRequest {
    /// Unique preset name.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Seats at the table.
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub player_count: Option<u32>,
    /// Role labels, one per seat.
    #[validate(length(min = 1, max = 100), custom(function = "validate_role_labels"))]
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_roles_are_rejected() {
        let request: CreatePresetRequest =
            serde_json::from_str(r#"{"name": "Trio", "roles": ["Mafia", " "]}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn empty_role_list_is_rejected() {
        let request: CreatePresetRequest =
            serde_json::from_str(r#"{"name": "Nobody", "roles": []}"#).unwrap();
        assert!(request.validate().is_err());
    }
}
