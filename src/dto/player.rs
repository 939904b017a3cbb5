//! Player payloads of the admin API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        format_system_time,
        validation::{validate_chat_id, validate_contact},
    },
    state::roster::Player,
};

/// Player as listed on the dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerView {
    /// Player identifier.
    pub id: Uuid,
    /// Identity on the livestream chat.
    pub chat_id: String,
    /// Display name.
    pub nickname: String,
    /// Messaging id used to deliver role cards.
    pub contact_id: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            chat_id: player.chat_id.clone(),
            nickname: player.nickname.clone(),
            contact_id: player.contact_id.clone(),
            phone: player.phone.clone(),
            created_at: format_system_time(player.created_at),
        }
    }
}

/// Register a new player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePlayerRequest {
    /// Identity on the livestream chat; unique across players.
    #[validate(custom(function = "validate_chat_id"))]
    pub chat_id: String,
    /// Display name.
    #[validate(length(min = 1, max = 64))]
    pub nickname: String,
    /// Numeric messaging id, or `@username` resolved through the bot.
    #[serde(default)]
    #[validate(custom(function = "validate_contact"))]
    pub contact: Option<String>,
    /// Optional phone number.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

/// Replaces the editable fields; omitted optional fields are cleared.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdatePlayerRequest {
    /// Display name.
    #[validate(length(min = 1, max = 64))]
    pub nickname: String,
    /// Numeric messaging id or `@username`.
    #[serde(default)]
    #[validate(custom(function = "validate_contact"))]
    pub contact: Option<String>,
    /// Optional phone number.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_bad_contact() {
        let request: CreatePlayerRequest = serde_json::from_str(
            r#"{"chat_id": "alice", "nickname": "Alice", "contact": "not a contact"}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());

        let request: CreatePlayerRequest =
            serde_json::from_str(r#"{"chat_id": "alice", "nickname": "Alice"}"#).unwrap();
        assert!(request.validate().is_ok());
    }
}
