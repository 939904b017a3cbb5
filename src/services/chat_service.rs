use tracing::{info, warn};

use crate::{
    dto::config::ChatStatusResponse,
    error::ServiceError,
    services::admin_service::CHAT_CHANNEL_KEY,
    state::SharedState,
};

/// (Re)start the chat listener on `channel` with a fresh retry budget.
pub async fn start_listener(state: &SharedState, channel: String) {
    state.chat().connect(channel).await;
}

/// Connect to `channel`, or to the stored channel when none is given.
///
/// A given channel is persisted so it survives restarts.
pub async fn connect(
    state: &SharedState,
    channel: Option<String>,
) -> Result<ChatStatusResponse, ServiceError> {
    let requested = channel
        .map(|channel| channel.trim().trim_start_matches('@').to_owned())
        .filter(|channel| !channel.is_empty());

    let channel = match requested {
        Some(channel) => {
            let store = state.require_store().await?;
            store
                .set_config(CHAT_CHANNEL_KEY.to_owned(), channel.clone())
                .await?;
            channel
        }
        None => stored_channel(state).await.ok_or_else(|| {
            ServiceError::InvalidInput("no chat channel configured".into())
        })?,
    };

    start_listener(state, channel).await;
    Ok(status(state).await)
}

/// Stop listening and forget the running connection.
pub async fn disconnect(state: &SharedState) -> ChatStatusResponse {
    state.chat().disconnect().await;
    status(state).await
}

/// Current listener state and channel.
pub async fn status(state: &SharedState) -> ChatStatusResponse {
    ChatStatusResponse {
        status: state.chat().status(),
        channel: state.chat().channel().await,
    }
}

/// Persisted channel, falling back to the configured default.
async fn stored_channel(state: &SharedState) -> Option<String> {
    let stored = match state.require_store().await {
        Ok(store) => match store.get_config(CHAT_CHANNEL_KEY.to_owned()).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "failed to read stored chat channel");
                None
            }
        },
        Err(_) => None,
    };
    stored
        .filter(|channel| !channel.trim().is_empty())
        .or_else(|| state.config().default_chat_channel.clone())
}

/// Start listening to the stored channel at start-up, when one is known.
pub async fn resume_listener(state: &SharedState) {
    match stored_channel(state).await {
        Some(channel) => {
            info!(channel = %channel, "resuming chat listener");
            start_listener(state, channel).await;
        }
        None => info!("no chat channel configured; chat listener idle"),
    }
}
