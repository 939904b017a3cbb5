use crate::{
    error::ServiceError,
    services::sse_events::{broadcast_queue_updated, broadcast_session_updated},
    state::{SharedState, lobby::Lobby, state_machine::SessionEvent},
};

/// Execute a planned session transition, then broadcast the session and the queue it drained.
pub async fn run_transition_with_broadcast<T, E, F>(
    state: &SharedState,
    event: SessionEvent,
    change: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(&mut Lobby) -> Result<T, E> + Send,
    E: Into<ServiceError>,
    T: Send,
{
    let (res, next) = state.run_transition(event, change).await?;
    broadcast_session_updated(state, next).await;
    broadcast_queue_updated(state).await;
    Ok(res)
}
