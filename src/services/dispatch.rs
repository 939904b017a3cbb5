//! Private delivery of role cards for the active game.

use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::game::DispatchReport,
    error::ServiceError,
    services::{messenger::role_card_text, sse_events::broadcast_session_updated},
    state::SharedState,
};

struct PendingCard {
    assignment_id: Uuid,
    nickname: String,
    role: String,
    contact: Option<String>,
}

/// Send every undelivered role card of the active game.
///
/// Failed sends stay undelivered so a later run retries them; delivered cards are never sent
/// twice. The run stops early when the game ends underneath it.
pub async fn dispatch(state: &SharedState) -> Result<DispatchReport, ServiceError> {
    let _guard = state.dispatch_guard().await;
    state.require_store().await?;

    let (session_id, pending) = state
        .read_lobby(|lobby| {
            let session = lobby
                .active_session()
                .ok_or(ServiceError::NoActiveSession)?;
            let pending: Vec<PendingCard> = session
                .assignments
                .iter()
                .filter(|assignment| !assignment.delivered)
                .map(|assignment| PendingCard {
                    assignment_id: assignment.id,
                    nickname: assignment.nickname.clone(),
                    role: assignment.role.clone(),
                    contact: lobby
                        .roster()
                        .get(&assignment.player_id)
                        .ok()
                        .and_then(|player| player.contact_id.clone()),
                })
                .collect();
            Ok::<_, ServiceError>((session.id, pending))
        })
        .await?;

    let limit = state.config().delivery_timeout;
    let mut report = DispatchReport::default();

    for card in pending {
        if !session_still_active(state, session_id).await {
            warn!(session_id = %session_id, "game ended during role delivery; stopping");
            break;
        }
        let Some(contact) = card.contact else {
            report.skipped_no_contact += 1;
            continue;
        };

        report.attempted += 1;
        let text = role_card_text(&card.nickname, &card.role);
        match timeout(limit, state.messenger().send_private_message(&contact, &text)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(nickname = %card.nickname, error = %err, "role card delivery failed");
                report.failed += 1;
                continue;
            }
            Err(_) => {
                warn!(nickname = %card.nickname, "role card delivery timed out");
                report.failed += 1;
                continue;
            }
        }

        match state
            .mutate(|lobby| lobby.mark_delivered(&session_id, &card.assignment_id))
            .await
        {
            Ok(_) => report.delivered += 1,
            Err(ServiceError::NoActiveSession) => {
                report.failed += 1;
                warn!(
                    session_id = %session_id,
                    nickname = %card.nickname,
                    "game ended while the card was in flight; stopping"
                );
                break;
            }
            Err(err) => {
                warn!(
                    nickname = %card.nickname,
                    error = %err,
                    "role card sent but delivery flag not saved"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        session_id = %session_id,
        attempted = report.attempted,
        delivered = report.delivered,
        failed = report.failed,
        skipped_no_contact = report.skipped_no_contact,
        "role delivery finished"
    );

    if report.delivered > 0 {
        let phase = state.session_phase().await;
        broadcast_session_updated(state, phase).await;
    }

    Ok(report)
}

async fn session_still_active(state: &SharedState, session_id: Uuid) -> bool {
    state
        .read_lobby(|lobby| lobby.active_session().map(|session| session.id))
        .await
        == Some(session_id)
}
