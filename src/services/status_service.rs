use crate::{dto::status::SystemStatusResponse, state::SharedState};

/// Snapshot of storage, chat, bot and lobby state for the dashboard header.
pub async fn system_status(state: &SharedState) -> SystemStatusResponse {
    let queue_length = state.read_lobby(|lobby| lobby.queue().count()).await;
    SystemStatusResponse {
        db: if state.is_degraded() {
            "degraded".into()
        } else {
            "connected".into()
        },
        chat: state.chat().status(),
        chat_channel: state.chat().channel().await,
        bot: state.messenger().is_available(),
        queue_length,
        session_phase: state.session_phase().await.as_str().into(),
    }
}
