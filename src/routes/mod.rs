use axum::Router;

use crate::state::SharedState;

/// OpenAPI document and Swagger UI.
pub mod docs;
/// Game start, end and role delivery.
pub mod game;
/// Liveness.
pub mod health;
/// Registration logs.
pub mod logs;
/// Player registry.
pub mod players;
/// Role presets.
pub mod presets;
/// Waiting queue.
pub mod queue;
/// Settings, status and chat control.
pub mod settings;
/// Server-sent events.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(players::router())
        .merge(queue::router())
        .merge(presets::router())
        .merge(game::router())
        .merge(logs::router())
        .merge(settings::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
