use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::logs::{LogsQuery, RegistrationCountResponse, RegistrationLogView},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Registration log routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/registration-logs", get(recent_logs))
        .route("/api/registration-logs/count", get(registration_counts))
}

/// Most recent registration attempts, newest first.
#[utoipa::path(
    get,
    path = "/api/registration-logs",
    tag = "logs",
    params(LogsQuery),
    responses((status = 200, description = "Recent registration attempts", body = [RegistrationLogView]))
)]
pub async fn recent_logs(
    State(state): State<SharedState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<RegistrationLogView>>, AppError> {
    Ok(Json(admin_service::recent_logs(&state, query.limit).await?))
}

/// Registration totals by outcome.
#[utoipa::path(
    get,
    path = "/api/registration-logs/count",
    tag = "logs",
    responses((status = 200, description = "Registration totals", body = RegistrationCountResponse))
)]
pub async fn registration_counts(
    State(state): State<SharedState>,
) -> Result<Json<RegistrationCountResponse>, AppError> {
    Ok(Json(admin_service::registration_counts(&state).await?))
}
