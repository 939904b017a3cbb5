//! Turns chat registration intents into queue admissions and audit entries.

use std::time::SystemTime;

use tokio::{sync::mpsc, time::timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{RegistrationLogEntity, RegistrationStatus},
    dto::logs::RegistrationLogView,
    error::ServiceError,
    services::{
        chat_listener::RegistrationIntent,
        messenger::queue_ack_text,
        sse_events::{broadcast_queue_updated, broadcast_registration_logged},
    },
    state::{SharedState, lobby::RegistrationOutcome},
};

/// Process one registration command sent by `chat_id`.
///
/// Every processed attempt yields exactly one audit entry, which is returned.
pub async fn handle(
    state: &SharedState,
    chat_id: &str,
) -> Result<RegistrationLogEntity, ServiceError> {
    let now = SystemTime::now();
    let outcome = state
        .mutate(|lobby| Ok::<_, ServiceError>(lobby.register_from_chat(chat_id, now)))
        .await?;

    let entry = log_entry(chat_id, &outcome, now);
    info!(
        chat_id,
        status = ?entry.status,
        message = %entry.message,
        "registration processed"
    );

    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = store.append_registration_log(entry.clone()).await {
                warn!(chat_id, error = %err, "failed to persist registration log");
            }
        }
        Err(err) => warn!(chat_id, error = %err, "registration log not persisted"),
    }
    broadcast_registration_logged(state, RegistrationLogView::from(&entry));

    if let RegistrationOutcome::Success { player, position } = outcome {
        broadcast_queue_updated(state).await;
        if let Some(contact) = player.contact_id {
            acknowledge(state, contact, queue_ack_text(&player.nickname, position));
        }
    }

    Ok(entry)
}

/// Consume registration intents until every sender is dropped.
pub async fn run_pump(state: SharedState, mut intents: mpsc::Receiver<RegistrationIntent>) {
    while let Some(intent) = intents.recv().await {
        if let Err(err) = handle(&state, &intent.chat_id).await {
            warn!(chat_id = %intent.chat_id, error = %err, "registration could not be processed");
        }
    }
    debug!("registration pump stopped");
}

fn log_entry(
    chat_id: &str,
    outcome: &RegistrationOutcome,
    now: SystemTime,
) -> RegistrationLogEntity {
    let (player, status, message) = match outcome {
        RegistrationOutcome::Success { player, position } => (
            Some(player),
            RegistrationStatus::Success,
            format!("added to queue, position {position}"),
        ),
        RegistrationOutcome::AlreadyQueued { player } => (
            Some(player),
            RegistrationStatus::AlreadyQueued,
            "already in queue".to_owned(),
        ),
        RegistrationOutcome::Failed { player, reason } => {
            (player.as_ref(), RegistrationStatus::Failed, reason.clone())
        }
    };

    RegistrationLogEntity {
        id: Uuid::new_v4(),
        player_id: player.map(|player| player.id),
        chat_id: chat_id.trim().to_owned(),
        nickname: player
            .map(|player| player.nickname.clone())
            .unwrap_or_else(|| chat_id.trim().to_owned()),
        status,
        message,
        created_at: now,
    }
}

/// Best-effort private confirmation; failures are only logged.
fn acknowledge(state: &SharedState, contact: String, text: String) {
    let send = state.messenger().send_private_message(&contact, &text);
    let limit = state.config().delivery_timeout;
    tokio::spawn(async move {
        match timeout(limit, send).await {
            Ok(Ok(())) => debug!(contact = %contact, "queue acknowledgement sent"),
            Ok(Err(err)) => debug!(contact = %contact, error = %err, "queue acknowledgement failed"),
            Err(_) => debug!(contact = %contact, "queue acknowledgement timed out"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::roster::Player;

    fn player() -> Player {
        Player {
            id: Uuid::new_v4(),
            chat_id: "alice".into(),
            nickname: "Alice".into(),
            contact_id: None,
            phone: None,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn success_entry_names_the_position() {
        let player = player();
        let entry = log_entry(
            "alice",
            &RegistrationOutcome::Success {
                player: player.clone(),
                position: 2,
            },
            SystemTime::now(),
        );
        assert_eq!(entry.status, RegistrationStatus::Success);
        assert_eq!(entry.player_id, Some(player.id));
        assert_eq!(entry.nickname, "Alice");
        assert!(entry.message.contains("position 2"));
    }

    #[test]
    fn unknown_identity_uses_the_raw_chat_id() {
        let entry = log_entry(
            " ghost123 ",
            &RegistrationOutcome::Failed {
                player: None,
                reason: "not registered on the platform".into(),
            },
            SystemTime::now(),
        );
        assert_eq!(entry.status, RegistrationStatus::Failed);
        assert_eq!(entry.player_id, None);
        assert_eq!(entry.chat_id, "ghost123");
        assert_eq!(entry.nickname, "ghost123");
        assert_eq!(entry.message, "not registered on the platform");
    }
}
