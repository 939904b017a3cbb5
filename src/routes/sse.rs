use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/events",
    tag = "sse",
    responses((status = 200, description = "Dashboard event stream", content_type = "text/event-stream", body = String))
)]
/// Stream queue, session, registration and chat events to the dashboard.
pub async fn events_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!("New SSE connection");
    sse_service::to_sse_stream(receiver, sse_service::handshake(&state))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/events", get(events_stream))
}
