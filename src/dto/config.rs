use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::chat_listener::ChatStatus;

/// Stored value of a runtime setting.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigValueResponse {
    /// Setting name.
    pub key: String,
    /// `None` when the setting was never written.
    pub value: Option<String>,
}

/// New value for a runtime setting.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetConfigRequest {
    /// Raw value, stored as given.
    #[validate(length(max = 256))]
    pub value: String,
}

/// Start listening to a livestream chat. Without `channel`, the stored one is used.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ChatConnectRequest {
    /// Channel to join.
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub channel: Option<String>,
}

/// Chat listener connectivity.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatStatusResponse {
    /// Current connection state.
    pub status: ChatStatus,
    /// Channel being listened to, if any.
    pub channel: Option<String>,
}
