//! Admin operations on players, the waiting queue, role presets, audit logs and settings.

use std::time::SystemTime;

use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        config::ConfigValueResponse,
        logs::{RegistrationCountResponse, RegistrationLogView},
        player::{CreatePlayerRequest, PlayerView, UpdatePlayerRequest},
        preset::{CreatePresetRequest, PresetView},
        queue::{ClearQueueResponse, EnqueueResponse, QueueEntryView},
    },
    error::ServiceError,
    services::{chat_service, sse_events::broadcast_queue_updated},
    state::{
        SharedState,
        roster::{NewPlayer, PlayerChanges},
    },
};

/// Persisted key holding the livestream channel to listen to.
pub const CHAT_CHANNEL_KEY: &str = "chat_channel";
/// Earlier name of [`CHAT_CHANNEL_KEY`], still accepted.
const CHAT_CHANNEL_ALIAS: &str = "tiktok_username";

/// All players, oldest first.
pub async fn list_players(state: &SharedState) -> Vec<PlayerView> {
    state
        .read_lobby(|lobby| lobby.roster().list().map(PlayerView::from).collect())
        .await
}

/// Register a player, resolving an `@username` contact first.
pub async fn create_player(
    state: &SharedState,
    request: CreatePlayerRequest,
) -> Result<PlayerView, ServiceError> {
    let contact_id = resolve_contact(state, request.contact).await;
    let new = NewPlayer {
        chat_id: request.chat_id,
        nickname: request.nickname,
        contact_id,
        phone: request.phone,
    };
    let player = state
        .mutate(|lobby| lobby.create_player(new, SystemTime::now()))
        .await?;
    info!(player_id = %player.id, chat_id = %player.chat_id, "player created");
    Ok(PlayerView::from(&player))
}

/// Replace a player's nickname, contact and phone.
pub async fn update_player(
    state: &SharedState,
    id: Uuid,
    request: UpdatePlayerRequest,
) -> Result<PlayerView, ServiceError> {
    let contact_id = resolve_contact(state, request.contact).await;
    let changes = PlayerChanges {
        nickname: request.nickname,
        contact_id,
        phone: request.phone,
    };
    let player = state
        .mutate(|lobby| lobby.update_player(&id, changes))
        .await?;
    broadcast_queue_updated(state).await;
    Ok(PlayerView::from(&player))
}

/// Delete a player along with their queue entry.
pub async fn delete_player(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let removed = state.mutate(|lobby| lobby.delete_player(&id)).await?;
    match removed {
        Some(player) => {
            info!(player_id = %player.id, chat_id = %player.chat_id, "player deleted");
            broadcast_queue_updated(state).await;
            Ok(())
        }
        None => Err(ServiceError::NotFound(format!("player `{id}` not found"))),
    }
}

/// Numeric contacts are kept as-is; `@username` is resolved through the messenger and
/// dropped when that fails.
async fn resolve_contact(state: &SharedState, contact: Option<String>) -> Option<String> {
    let contact = contact
        .map(|contact| contact.trim().to_owned())
        .filter(|contact| !contact.is_empty())?;
    if !contact.starts_with('@') {
        return Some(contact);
    }

    let lookup = state.messenger().resolve_contact(&contact);
    match timeout(state.config().delivery_timeout, lookup).await {
        Ok(Ok(Some(resolved))) => Some(resolved),
        Ok(Ok(None)) => {
            warn!(username = %contact, "messaging username not found; contact left empty");
            None
        }
        Ok(Err(err)) => {
            warn!(username = %contact, error = %err, "contact resolution failed; contact left empty");
            None
        }
        Err(_) => {
            warn!(username = %contact, "contact resolution timed out; contact left empty");
            None
        }
    }
}

/// Queue in FIFO order with 1-based positions.
pub async fn list_queue(state: &SharedState) -> Vec<QueueEntryView> {
    state
        .read_lobby(|lobby| {
            lobby
                .queued_players()
                .into_iter()
                .map(QueueEntryView::from)
                .collect()
        })
        .await
}

/// Admit an existing player at the tail of the queue. No audit entry is written.
pub async fn enqueue(state: &SharedState, player_id: Uuid) -> Result<EnqueueResponse, ServiceError> {
    let position = state
        .mutate(|lobby| lobby.enqueue(&player_id, SystemTime::now()))
        .await?;
    info!(player_id = %player_id, position, "player queued by admin");
    broadcast_queue_updated(state).await;
    Ok(EnqueueResponse {
        player_id,
        position,
    })
}

/// Remove a player from the queue; absent players are a no-op.
pub async fn dequeue(state: &SharedState, player_id: Uuid) -> Result<bool, ServiceError> {
    let removed = state
        .mutate(|lobby| Ok::<_, ServiceError>(lobby.dequeue(&player_id)))
        .await?;
    if removed {
        broadcast_queue_updated(state).await;
    }
    Ok(removed)
}

/// Drop every queue entry.
pub async fn clear_queue(state: &SharedState) -> Result<ClearQueueResponse, ServiceError> {
    let removed = state
        .mutate(|lobby| Ok::<_, ServiceError>(lobby.clear_queue()))
        .await?;
    info!(removed, "queue cleared");
    broadcast_queue_updated(state).await;
    Ok(ClearQueueResponse { removed })
}

/// Presets ordered by player count, then name.
pub async fn list_presets(state: &SharedState) -> Vec<PresetView> {
    state
        .read_lobby(|lobby| lobby.presets().list().into_iter().map(PresetView::from).collect())
        .await
}

/// Validate and store a new preset.
pub async fn create_preset(
    state: &SharedState,
    request: CreatePresetRequest,
) -> Result<PresetView, ServiceError> {
    let CreatePresetRequest {
        name,
        player_count,
        roles,
    } = request;
    let preset = state
        .mutate(|lobby| lobby.create_preset(&name, player_count, roles, SystemTime::now()))
        .await?;
    info!(preset_id = %preset.id, name = %preset.name, "role preset created");
    Ok(PresetView::from(&preset))
}

/// Delete a preset; unknown ids are a no-op. Sessions keep their own copy of the roles.
pub async fn delete_preset(state: &SharedState, id: Uuid) -> Result<bool, ServiceError> {
    state
        .mutate(|lobby| Ok::<_, ServiceError>(lobby.delete_preset(&id).is_some()))
        .await
}

/// Most recent registration attempts, newest first, capped by the retention window.
pub async fn recent_logs(
    state: &SharedState,
    limit: Option<usize>,
) -> Result<Vec<RegistrationLogView>, ServiceError> {
    let retention = state.config().registration_log_retention;
    let limit = limit.unwrap_or(retention).clamp(1, retention);
    let store = state.require_store().await?;
    let entries = store.recent_registration_logs(limit).await?;
    Ok(entries.iter().map(RegistrationLogView::from).collect())
}

/// Totals per registration outcome.
pub async fn registration_counts(
    state: &SharedState,
) -> Result<RegistrationCountResponse, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.registration_stats().await?.into())
}

/// Map legacy key names onto their current spelling and reject malformed keys.
pub fn normalize_config_key(key: &str) -> Result<String, ServiceError> {
    let key = key.trim().to_ascii_lowercase();
    if key.is_empty()
        || key.len() > 64
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(ServiceError::InvalidInput(format!(
            "invalid configuration key `{key}`"
        )));
    }
    if key == CHAT_CHANNEL_ALIAS {
        return Ok(CHAT_CHANNEL_KEY.to_owned());
    }
    Ok(key)
}

/// Read a stored setting.
pub async fn get_config(state: &SharedState, key: &str) -> Result<ConfigValueResponse, ServiceError> {
    let key = normalize_config_key(key)?;
    let store = state.require_store().await?;
    let mut value = store.get_config(key.clone()).await?;
    if value.is_none() && key == CHAT_CHANNEL_KEY {
        value = state.config().default_chat_channel.clone();
    }
    Ok(ConfigValueResponse { key, value })
}

/// Persist a setting. Changing the chat channel reconnects the listener to it.
pub async fn set_config(
    state: &SharedState,
    key: &str,
    value: String,
) -> Result<ConfigValueResponse, ServiceError> {
    let key = normalize_config_key(key)?;
    let value = value.trim().to_owned();
    let store = state.require_store().await?;
    store.set_config(key.clone(), value.clone()).await?;
    info!(key = %key, "configuration updated");

    if key == CHAT_CHANNEL_KEY && !value.is_empty() {
        chat_service::start_listener(state, value.clone()).await;
    }

    Ok(ConfigValueResponse {
        key,
        value: Some(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_channel_key_is_aliased() {
        assert_eq!(normalize_config_key("tiktok_username").unwrap(), "chat_channel");
        assert_eq!(normalize_config_key(" Chat_Channel ").unwrap(), "chat_channel");
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(matches!(
            normalize_config_key("bad key"),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(normalize_config_key("").is_err());
    }
}
