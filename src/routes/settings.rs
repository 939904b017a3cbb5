use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        config::{ChatConnectRequest, ChatStatusResponse, ConfigValueResponse, SetConfigRequest},
        status::SystemStatusResponse,
    },
    error::AppError,
    services::{admin_service, chat_service, status_service},
    state::SharedState,
};

/// Runtime settings, system status and chat listener control.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/config/{key}", get(get_config).post(set_config))
        .route("/api/status", get(system_status))
        .route("/api/chat/connect", post(chat_connect))
        .route("/api/chat/disconnect", post(chat_disconnect))
}

/// Read a setting.
#[utoipa::path(
    get,
    path = "/api/config/{key}",
    tag = "settings",
    params(("key" = String, Path, description = "Setting name, e.g. `chat_channel`")),
    responses((status = 200, description = "Stored value, null when unset", body = ConfigValueResponse))
)]
pub async fn get_config(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<ConfigValueResponse>, AppError> {
    Ok(Json(admin_service::get_config(&state, &key).await?))
}

/// Store a setting. Writing `chat_channel` reconnects the chat listener.
#[utoipa::path(
    post,
    path = "/api/config/{key}",
    tag = "settings",
    params(("key" = String, Path, description = "Setting name, e.g. `chat_channel`")),
    request_body = SetConfigRequest,
    responses((status = 200, description = "Value stored", body = ConfigValueResponse))
)]
pub async fn set_config(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<SetConfigRequest>,
) -> Result<Json<ConfigValueResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        admin_service::set_config(&state, &key, payload.value).await?,
    ))
}

/// Database, chat, bot and session overview.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "settings",
    responses((status = 200, description = "Storage, chat and bot status", body = SystemStatusResponse))
)]
pub async fn system_status(State(state): State<SharedState>) -> Json<SystemStatusResponse> {
    Json(status_service::system_status(&state).await)
}

/// Connect the chat listener.
#[utoipa::path(
    post,
    path = "/api/chat/connect",
    tag = "settings",
    request_body = ChatConnectRequest,
    responses(
        (status = 200, description = "Listener started", body = ChatStatusResponse),
        (status = 400, description = "No channel given or stored", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn chat_connect(
    State(state): State<SharedState>,
    payload: Option<Json<ChatConnectRequest>>,
) -> Result<Json<ChatStatusResponse>, AppError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    payload.validate()?;
    Ok(Json(chat_service::connect(&state, payload.channel).await?))
}

/// Stop the chat listener.
#[utoipa::path(
    post,
    path = "/api/chat/disconnect",
    tag = "settings",
    responses((status = 200, description = "Listener stopped", body = ChatStatusResponse))
)]
pub async fn chat_disconnect(State(state): State<SharedState>) -> Json<ChatStatusResponse> {
    Json(chat_service::disconnect(&state).await)
}
