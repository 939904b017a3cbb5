use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        common::ActionResponse,
        queue::{ClearQueueResponse, EnqueueRequest, EnqueueResponse, QueueEntryView},
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Routes exposing the waiting queue.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/queue", get(list_queue).post(enqueue))
        .route("/api/queue/clear", post(clear_queue))
        .route("/api/queue/{player_id}", delete(dequeue))
}

/// Queue in FIFO order.
#[utoipa::path(
    get,
    path = "/api/queue",
    tag = "queue",
    responses((status = 200, description = "Queued players in order", body = [QueueEntryView]))
)]
pub async fn list_queue(State(state): State<SharedState>) -> Json<Vec<QueueEntryView>> {
    Json(admin_service::list_queue(&state).await)
}

/// Admit an existing player to the queue.
#[utoipa::path(
    post,
    path = "/api/queue",
    tag = "queue",
    request_body = EnqueueRequest,
    responses(
        (status = 201, description = "Player queued", body = EnqueueResponse),
        (status = 404, description = "Unknown player", body = crate::dto::common::ErrorResponse),
        (status = 409, description = "Player already queued", body = crate::dto::common::ErrorResponse),
        (status = 422, description = "Queue is full", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn enqueue(
    State(state): State<SharedState>,
    Json(payload): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    let response = admin_service::enqueue(&state, payload.player_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Remove a player from the queue. Succeeds when the player was not queued.
#[utoipa::path(
    delete,
    path = "/api/queue/{player_id}",
    tag = "queue",
    params(("player_id" = Uuid, Path, description = "Queued player")),
    responses((status = 200, description = "Player no longer queued", body = ActionResponse))
)]
pub async fn dequeue(
    State(state): State<SharedState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    let message = if admin_service::dequeue(&state, player_id).await? {
        "player removed from queue"
    } else {
        "player was not queued"
    };
    Ok(Json(ActionResponse::new(message)))
}

/// Empty the queue.
#[utoipa::path(
    post,
    path = "/api/queue/clear",
    tag = "queue",
    responses((status = 200, description = "Queue emptied", body = ClearQueueResponse))
)]
pub async fn clear_queue(
    State(state): State<SharedState>,
) -> Result<Json<ClearQueueResponse>, AppError> {
    Ok(Json(admin_service::clear_queue(&state).await?))
}
