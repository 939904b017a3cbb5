use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        common::ActionResponse,
        preset::{CreatePresetRequest, PresetView},
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Routes managing role presets.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/role-presets", get(list_presets).post(create_preset))
        .route("/api/role-presets/{id}", delete(delete_preset))
}

/// Presets ordered by player count, then name.
#[utoipa::path(
    get,
    path = "/api/role-presets",
    tag = "presets",
    responses((status = 200, description = "Presets by player count, then name", body = [PresetView]))
)]
pub async fn list_presets(State(state): State<SharedState>) -> Json<Vec<PresetView>> {
    Json(admin_service::list_presets(&state).await)
}

/// Create a preset.
#[utoipa::path(
    post,
    path = "/api/role-presets",
    tag = "presets",
    request_body = CreatePresetRequest,
    responses(
        (status = 201, description = "Preset created", body = PresetView),
        (status = 400, description = "Role count does not match the player count", body = crate::dto::common::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn create_preset(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePresetRequest>,
) -> Result<(StatusCode, Json<PresetView>), AppError> {
    payload.validate()?;
    let preset = admin_service::create_preset(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(preset)))
}

/// Delete a preset. Unknown ids succeed.
#[utoipa::path(
    delete,
    path = "/api/role-presets/{id}",
    tag = "presets",
    params(("id" = Uuid, Path, description = "Preset identifier")),
    responses((status = 200, description = "Preset gone", body = ActionResponse))
)]
pub async fn delete_preset(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    let message = if admin_service::delete_preset(&state, id).await? {
        "preset deleted"
    } else {
        "preset did not exist"
    };
    Ok(Json(ActionResponse::new(message)))
}
