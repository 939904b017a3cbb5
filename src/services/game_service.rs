//! Game session lifecycle: draft, deliver, end.

use std::time::SystemTime;

use tracing::info;

use crate::{
    dto::game::{CurrentGameResponse, DispatchReport, SessionView, StartGameRequest},
    error::ServiceError,
    services::dispatch,
    state::{
        SharedState, state_machine::SessionEvent, transitions::run_transition_with_broadcast,
    },
};

/// Draft the head of the queue into a new game using the chosen preset.
pub async fn start_game(
    state: &SharedState,
    request: StartGameRequest,
) -> Result<SessionView, ServiceError> {
    let StartGameRequest {
        preset_id,
        player_count,
    } = request;
    let now = SystemTime::now();

    let session = run_transition_with_broadcast(state, SessionEvent::Start, move |lobby| {
        lobby.start_session(&preset_id, player_count, &mut rand::rng(), now)
    })
    .await?;

    info!(
        session_id = %session.id,
        preset = %session.preset_name,
        players = session.assignments.len(),
        "game started"
    );
    Ok(SessionView::from(&session))
}

/// End the active game and flush the remaining queue.
pub async fn end_game(state: &SharedState) -> Result<SessionView, ServiceError> {
    let now = SystemTime::now();
    let session = run_transition_with_broadcast(state, SessionEvent::End, move |lobby| {
        lobby.end_session(now)
    })
    .await?;

    info!(session_id = %session.id, "game ended");
    Ok(SessionView::from(&session))
}

/// Assignments of the running game.
pub async fn current_game(state: &SharedState) -> CurrentGameResponse {
    state
        .read_lobby(|lobby| CurrentGameResponse::from_active(lobby.active_session()))
        .await
}

/// Deliver the pending role cards of the active game.
pub async fn send_cards(state: &SharedState) -> Result<DispatchReport, ServiceError> {
    dispatch::dispatch(state).await
}
