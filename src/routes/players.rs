use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::player::{CreatePlayerRequest, PlayerView, UpdatePlayerRequest},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Routes managing registered players.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/users", get(list_players).post(create_player))
        .route("/api/users/{id}", put(update_player).delete(delete_player))
}

/// All registered players.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "players",
    responses((status = 200, description = "Registered players", body = [PlayerView]))
)]
pub async fn list_players(State(state): State<SharedState>) -> Json<Vec<PlayerView>> {
    Json(admin_service::list_players(&state).await)
}

/// Register a player. An `@username` contact is resolved through the messaging bot.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "players",
    request_body = CreatePlayerRequest,
    responses(
        (status = 201, description = "Player created", body = PlayerView),
        (status = 400, description = "Invalid payload", body = crate::dto::common::ErrorResponse),
        (status = 409, description = "Chat identity or contact already registered", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn create_player(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerView>), AppError> {
    payload.validate()?;
    let player = admin_service::create_player(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// Replace a player's editable fields.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "players",
    params(("id" = Uuid, Path, description = "Player identifier")),
    request_body = UpdatePlayerRequest,
    responses(
        (status = 200, description = "Player updated", body = PlayerView),
        (status = 404, description = "Unknown player", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn update_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlayerRequest>,
) -> Result<Json<PlayerView>, AppError> {
    payload.validate()?;
    let player = admin_service::update_player(&state, id, payload).await?;
    Ok(Json(player))
}

/// Delete a player and their queue entry.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "players",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 204, description = "Player deleted"),
        (status = 404, description = "Unknown player", body = crate::dto::common::ErrorResponse),
        (status = 409, description = "Player is part of the running game", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_player(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
