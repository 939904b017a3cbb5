use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::game::{CurrentGameResponse, DispatchReport, SessionView, StartGameRequest},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes driving the game session lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/game/current", get(current_game))
        .route("/api/game/start", post(start_game))
        .route("/api/game/send-cards", post(send_cards))
        .route("/api/game/end", post(end_game))
}

/// Assignments of the running game, empty when none runs.
#[utoipa::path(
    get,
    path = "/api/game/current",
    tag = "game",
    responses((status = 200, description = "Current assignments", body = CurrentGameResponse))
)]
pub async fn current_game(State(state): State<SharedState>) -> Json<CurrentGameResponse> {
    Json(game_service::current_game(&state).await)
}

/// Draft the head of the queue and deal the preset's roles at random.
#[utoipa::path(
    post,
    path = "/api/game/start",
    tag = "game",
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Game started", body = SessionView),
        (status = 400, description = "Player count does not match the preset", body = crate::dto::common::ErrorResponse),
        (status = 404, description = "Unknown preset", body = crate::dto::common::ErrorResponse),
        (status = 409, description = "A game is already running", body = crate::dto::common::ErrorResponse),
        (status = 422, description = "Not enough queued players", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Json(payload): Json<StartGameRequest>,
) -> Result<Json<SessionView>, AppError> {
    payload.validate()?;
    let session = game_service::start_game(&state, payload).await?;
    Ok(Json(session))
}

/// Send undelivered role cards by private message.
#[utoipa::path(
    post,
    path = "/api/game/send-cards",
    tag = "game",
    responses(
        (status = 200, description = "Delivery report", body = DispatchReport),
        (status = 409, description = "No game is running", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn send_cards(State(state): State<SharedState>) -> Result<Json<DispatchReport>, AppError> {
    Ok(Json(game_service::send_cards(&state).await?))
}

/// End the running game; the whole queue is cleared.
#[utoipa::path(
    post,
    path = "/api/game/end",
    tag = "game",
    responses(
        (status = 200, description = "Game ended", body = SessionView),
        (status = 409, description = "No game is running", body = crate::dto::common::ErrorResponse)
    )
)]
pub async fn end_game(State(state): State<SharedState>) -> Result<Json<SessionView>, AppError> {
    Ok(Json(game_service::end_game(&state).await?))
}
