use std::time::SystemTime;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::RolePresetEntity;

/// Named template of roles for a fixed number of players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePreset {
    /// Preset identifier.
    pub id: Uuid,
    /// Unique name.
    pub name: String,
    /// Seats at the table.
    pub player_count: u32,
    /// Role labels, one per seat.
    pub roles: Vec<String>,
    /// Creation time.
    pub created_at: SystemTime,
}

/// Preset rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    /// Another preset has this name.
    #[error("preset `{0}` already exists")]
    DuplicateName(String),
    /// Roles or player count are inconsistent.
    #[error("invalid preset: {0}")]
    Invalid(String),
    /// Unknown preset.
    #[error("preset `{0}` not found")]
    NotFound(Uuid),
}

/// Catalog of role presets, listed by player count then name.
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    presets: IndexMap<Uuid, RolePreset>,
}

impl PresetCatalog {
    /// Rebuild the catalog from stored presets.
    pub fn from_presets(presets: Vec<RolePreset>) -> Self {
        Self {
            presets: presets
                .into_iter()
                .map(|preset| (preset.id, preset))
                .collect(),
        }
    }

    /// Validate and register a new preset.
    ///
    /// `player_count`, when provided, must equal the number of roles; when omitted it is
    /// derived from them. Names and role labels are trimmed and must not be blank.
    pub fn create(
        &mut self,
        name: &str,
        player_count: Option<u32>,
        roles: Vec<String>,
        now: SystemTime,
    ) -> Result<RolePreset, PresetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::Invalid("preset name must not be empty".into()));
        }
        if roles.is_empty() {
            return Err(PresetError::Invalid(
                "a preset needs at least one role".into(),
            ));
        }

        let roles: Vec<String> = roles.iter().map(|role| role.trim().to_owned()).collect();
        if roles.iter().any(String::is_empty) {
            return Err(PresetError::Invalid("role labels must not be empty".into()));
        }

        let role_count = u32::try_from(roles.len())
            .map_err(|_| PresetError::Invalid("too many roles".into()))?;
        if let Some(declared) = player_count
            && declared != role_count
        {
            return Err(PresetError::Invalid(format!(
                "player count {declared} does not match the {role_count} roles provided"
            )));
        }

        if self
            .presets
            .values()
            .any(|existing| existing.name.eq_ignore_ascii_case(name))
        {
            return Err(PresetError::DuplicateName(name.to_owned()));
        }

        let preset = RolePreset {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            player_count: role_count,
            roles,
            created_at: now,
        };
        self.presets.insert(preset.id, preset.clone());
        Ok(preset)
    }

    /// Look up a preset.
    pub fn get(&self, id: &Uuid) -> Result<&RolePreset, PresetError> {
        self.presets.get(id).ok_or(PresetError::NotFound(*id))
    }

    /// Presets ordered by player count ascending, then by name.
    pub fn list(&self) -> Vec<&RolePreset> {
        let mut presets: Vec<&RolePreset> = self.presets.values().collect();
        presets.sort_by(|a, b| {
            a.player_count
                .cmp(&b.player_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        presets
    }

    /// Remove a preset; deleting an unknown id is a no-op.
    pub fn delete(&mut self, id: &Uuid) -> Option<RolePreset> {
        self.presets.shift_remove(id)
    }
}

impl From<RolePresetEntity> for RolePreset {
    fn from(value: RolePresetEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            player_count: value.player_count,
            roles: value.roles,
            created_at: value.created_at,
        }
    }
}

impl From<RolePreset> for RolePresetEntity {
    fn from(value: RolePreset) -> Self {
        Self {
            id: value.id,
            name: value.name,
            player_count: value.player_count,
            roles: value.roles,
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    #[test]
    fn player_count_is_derived_from_roles() {
        let mut catalog = PresetCatalog::default();
        let preset = catalog
            .create(
                " Trio ",
                None,
                roles(&["Civilian", "Mafia", "Detective"]),
                SystemTime::now(),
            )
            .unwrap();
        assert_eq!(preset.name, "Trio");
        assert_eq!(preset.player_count, 3);
    }

    #[test]
    fn mismatched_or_empty_presets_are_invalid() {
        let mut catalog = PresetCatalog::default();
        let err = catalog
            .create("Duo", Some(3), roles(&["Mafia", "Civilian"]), SystemTime::now())
            .unwrap_err();
        assert!(matches!(err, PresetError::Invalid(_)));

        let err = catalog
            .create("Empty", None, Vec::new(), SystemTime::now())
            .unwrap_err();
        assert!(matches!(err, PresetError::Invalid(_)));

        let err = catalog
            .create("Blank", None, roles(&["Mafia", "  "]), SystemTime::now())
            .unwrap_err();
        assert!(matches!(err, PresetError::Invalid(_)));
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let mut catalog = PresetCatalog::default();
        catalog
            .create("Classic", None, roles(&["Mafia"]), SystemTime::now())
            .unwrap();
        let err = catalog
            .create("classic", None, roles(&["Doctor"]), SystemTime::now())
            .unwrap_err();
        assert_eq!(err, PresetError::DuplicateName("classic".into()));
    }

    #[test]
    fn list_orders_by_player_count_and_delete_is_idempotent() {
        let mut catalog = PresetCatalog::default();
        let big = catalog
            .create("Big", None, roles(&["A", "B", "C"]), SystemTime::now())
            .unwrap();
        catalog
            .create("Small", None, roles(&["A"]), SystemTime::now())
            .unwrap();

        let names: Vec<&str> = catalog.list().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Small", "Big"]);

        assert!(catalog.delete(&big.id).is_some());
        assert!(catalog.delete(&big.id).is_none());
        assert_eq!(catalog.get(&big.id), Err(PresetError::NotFound(big.id)));
    }
}
