//! End-to-end lobby scenarios driven through the service layer over the in-memory store.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex, OnceLock, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use mafia_lobby_back::{
    config::AppConfig,
    dao::{lobby_store::MemoryLobbyStore, models::RegistrationStatus},
    dto::{
        game::StartGameRequest,
        player::{CreatePlayerRequest, PlayerView},
        preset::{CreatePresetRequest, PresetView},
    },
    error::ServiceError,
    services::{
        admin_service,
        chat_listener::{ChatConnector, ChatError, ChatListener, ChatStream, ListenerPolicy},
        game_service,
        messenger::{Messenger, MessengerError},
        registration,
    },
    state::{AppState, SharedState, state_machine::SessionPhase},
};

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    fn sent_to(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(contact, _)| contact.clone())
            .collect()
    }
}

impl Messenger for RecordingMessenger {
    fn send_private_message(
        &self,
        contact: &str,
        text: &str,
    ) -> BoxFuture<'static, Result<(), MessengerError>> {
        let result = if contact == "broken" {
            Err(MessengerError::Rejected {
                description: "chat not found".into(),
            })
        } else {
            self.sent
                .lock()
                .unwrap()
                .push((contact.to_owned(), text.to_owned()));
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn resolve_contact(
        &self,
        _username: &str,
    ) -> BoxFuture<'static, Result<Option<String>, MessengerError>> {
        Box::pin(async { Ok(None) })
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct OfflineChat;

impl ChatConnector for OfflineChat {
    fn connect(&self, _channel: &str) -> BoxFuture<'static, Result<ChatStream, ChatError>> {
        Box::pin(async { Err(ChatError::Connect("offline".into())) })
    }
}

/// Ends the running game while the first card is being sent, then reports that send as failed.
#[derive(Default)]
struct GameEndingMessenger {
    state: OnceLock<Weak<AppState>>,
    armed: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl Messenger for GameEndingMessenger {
    fn send_private_message(
        &self,
        contact: &str,
        _text: &str,
    ) -> BoxFuture<'static, Result<(), MessengerError>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let state = self.state.get().and_then(Weak::upgrade);
            return Box::pin(async move {
                if let Some(state) = state {
                    game_service::end_game(&state).await.unwrap();
                }
                Err(MessengerError::Rejected {
                    description: "bot was blocked".into(),
                })
            });
        }
        self.sent.lock().unwrap().push(contact.to_owned());
        Box::pin(async { Ok(()) })
    }

    fn resolve_contact(
        &self,
        _username: &str,
    ) -> BoxFuture<'static, Result<Option<String>, MessengerError>> {
        Box::pin(async { Ok(None) })
    }

    fn is_available(&self) -> bool {
        true
    }
}

async fn lobby_with(messenger: Arc<dyn Messenger>) -> SharedState {
    let (tx, _rx) = mpsc::channel(8);
    let chat = ChatListener::new(
        Arc::new(OfflineChat),
        ListenerPolicy {
            registration_command: "!reg".into(),
            reconnect_delay: Duration::from_millis(1),
            max_attempts: 1,
        },
        tx,
    );
    let config = AppConfig::default();
    let retention = config.registration_log_retention;
    let state = AppState::new(config, messenger, chat);
    state
        .install_store(Arc::new(MemoryLobbyStore::new(retention)))
        .await;
    state.hydrate().await.unwrap();
    state
}

async fn lobby() -> (SharedState, Arc<RecordingMessenger>) {
    let messenger = Arc::new(RecordingMessenger::default());
    (lobby_with(messenger.clone()).await, messenger)
}

async fn player(state: &SharedState, chat_id: &str, contact: Option<&str>) -> PlayerView {
    admin_service::create_player(
        state,
        CreatePlayerRequest {
            chat_id: chat_id.into(),
            nickname: chat_id.to_uppercase(),
            contact: contact.map(str::to_owned),
            phone: None,
        },
    )
    .await
    .unwrap()
}

async fn trio(state: &SharedState) -> PresetView {
    admin_service::create_preset(
        state,
        CreatePresetRequest {
            name: "Trio".into(),
            player_count: Some(3),
            roles: vec!["Mafia".into(), "Doctor".into(), "Civilian".into()],
        },
    )
    .await
    .unwrap()
}

async fn queued_chat_ids(state: &SharedState) -> Vec<String> {
    admin_service::list_queue(state)
        .await
        .into_iter()
        .map(|entry| entry.chat_id)
        .collect()
}

fn start(preset: &PresetView) -> StartGameRequest {
    StartGameRequest {
        preset_id: preset.id,
        player_count: None,
    }
}

#[tokio::test]
async fn chat_registrations_queue_in_arrival_order() {
    let (state, _) = lobby().await;
    for chat_id in ["bob", "alice", "carol"] {
        player(&state, chat_id, None).await;
    }

    for chat_id in ["carol", "alice", "bob"] {
        let entry = registration::handle(&state, chat_id).await.unwrap();
        assert_eq!(entry.status, RegistrationStatus::Success);
    }

    assert_eq!(queued_chat_ids(&state).await, ["carol", "alice", "bob"]);
    let positions: Vec<usize> = admin_service::list_queue(&state)
        .await
        .iter()
        .map(|entry| entry.position)
        .collect();
    assert_eq!(positions, [1, 2, 3]);
}

#[tokio::test]
async fn repeated_and_unknown_registrations_are_logged_without_queueing() {
    let (state, _) = lobby().await;
    player(&state, "alice", None).await;

    let first = registration::handle(&state, "alice").await.unwrap();
    let second = registration::handle(&state, "alice").await.unwrap();
    let ghost = registration::handle(&state, "ghost123").await.unwrap();

    assert_eq!(first.status, RegistrationStatus::Success);
    assert_eq!(second.status, RegistrationStatus::AlreadyQueued);
    assert_eq!(ghost.status, RegistrationStatus::Failed);
    assert!(ghost.player_id.is_none());
    assert_eq!(queued_chat_ids(&state).await, ["alice"]);

    let counts = admin_service::registration_counts(&state).await.unwrap();
    assert_eq!(
        (counts.successful, counts.failed, counts.already_queued),
        (1, 1, 1)
    );

    let logs = admin_service::recent_logs(&state, None).await.unwrap();
    let chat_ids: Vec<&str> = logs.iter().map(|log| log.chat_id.as_str()).collect();
    assert_eq!(chat_ids, ["ghost123", "alice", "alice"]);
}

#[tokio::test]
async fn starting_a_game_drafts_the_queue_head_with_shuffled_roles() {
    let (state, _) = lobby().await;
    for chat_id in ["ann", "ben", "cat", "dan"] {
        player(&state, chat_id, None).await;
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;

    let session = game_service::start_game(&state, start(&preset)).await.unwrap();

    let drafted: HashSet<String> = session
        .assignments
        .iter()
        .map(|assignment| assignment.nickname.clone())
        .collect();
    assert_eq!(
        drafted,
        HashSet::from(["ANN".to_owned(), "BEN".to_owned(), "CAT".to_owned()])
    );

    let mut roles: Vec<&str> = session
        .assignments
        .iter()
        .map(|assignment| assignment.role.as_str())
        .collect();
    roles.sort_unstable();
    assert_eq!(roles, ["Civilian", "Doctor", "Mafia"]);
    assert!(session.assignments.iter().all(|assignment| !assignment.delivered));

    assert_eq!(queued_chat_ids(&state).await, ["dan"]);
    assert_eq!(admin_service::list_queue(&state).await[0].position, 1);
    assert_eq!(state.session_phase().await, SessionPhase::Active);

    let current = game_service::current_game(&state).await;
    assert!(current.active);
    assert_eq!(current.session_id, Some(session.id));
}

#[tokio::test]
async fn a_short_queue_refuses_to_start_and_changes_nothing() {
    let (state, _) = lobby().await;
    for chat_id in ["ann", "ben"] {
        player(&state, chat_id, None).await;
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;

    let err = game_service::start_game(&state, start(&preset))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::InsufficientResources(_)));
    assert_eq!(queued_chat_ids(&state).await, ["ann", "ben"]);
    assert!(!game_service::current_game(&state).await.active);
    assert_eq!(state.session_phase().await, SessionPhase::Idle);
}

#[tokio::test]
async fn a_second_game_cannot_start_while_one_runs() {
    let (state, _) = lobby().await;
    for chat_id in ["a1", "a2", "a3", "a4", "a5", "a6"] {
        player(&state, chat_id, None).await;
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;
    game_service::start_game(&state, start(&preset)).await.unwrap();

    let err = game_service::start_game(&state, start(&preset))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(queued_chat_ids(&state).await, ["a4", "a5", "a6"]);
}

#[tokio::test]
async fn role_cards_are_delivered_once() {
    let (state, messenger) = lobby().await;
    player(&state, "ann", Some("1001")).await;
    player(&state, "ben", Some("1002")).await;
    player(&state, "cat", None).await;
    for chat_id in ["ann", "ben", "cat"] {
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;
    game_service::start_game(&state, start(&preset)).await.unwrap();

    let first = game_service::send_cards(&state).await.unwrap();
    assert_eq!(first.attempted, 2);
    assert_eq!(first.delivered, 2);
    assert_eq!(first.failed, 0);
    assert_eq!(first.skipped_no_contact, 1);

    let second = game_service::send_cards(&state).await.unwrap();
    assert_eq!(second.attempted, 0);
    assert_eq!(second.delivered, 0);
    assert_eq!(second.skipped_no_contact, 1);

    let mut recipients = messenger.sent_to();
    recipients.sort();
    assert_eq!(recipients, ["1001", "1002"]);
    assert!(
        messenger
            .sent
            .lock()
            .unwrap()
            .iter()
            .all(|(_, text)| text.starts_with("Your role: "))
    );

    let current = game_service::current_game(&state).await;
    let delivered = current
        .assignments
        .iter()
        .filter(|assignment| assignment.delivered)
        .count();
    assert_eq!(delivered, 2);
}

#[tokio::test]
async fn failed_sends_stay_pending_for_the_next_run() {
    let (state, messenger) = lobby().await;
    player(&state, "ann", Some("1001")).await;
    player(&state, "ben", Some("broken")).await;
    player(&state, "cat", Some("1003")).await;
    for chat_id in ["ann", "ben", "cat"] {
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;
    game_service::start_game(&state, start(&preset)).await.unwrap();

    let first = game_service::send_cards(&state).await.unwrap();
    assert_eq!((first.attempted, first.delivered, first.failed), (3, 2, 1));

    let retry = game_service::send_cards(&state).await.unwrap();
    assert_eq!((retry.attempted, retry.delivered, retry.failed), (1, 0, 1));
    assert_eq!(messenger.sent_to().len(), 2);
}

#[tokio::test]
async fn sending_cards_without_a_game_is_refused() {
    let (state, _) = lobby().await;
    let err = game_service::send_cards(&state).await.unwrap_err();
    assert!(matches!(err, ServiceError::NoActiveSession));
}

#[tokio::test]
async fn ending_a_game_flushes_the_queue_and_allows_a_new_one() {
    let (state, _) = lobby().await;
    for chat_id in ["a1", "a2", "a3", "a4"] {
        player(&state, chat_id, None).await;
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;
    let first = game_service::start_game(&state, start(&preset)).await.unwrap();

    let ended = game_service::end_game(&state).await.unwrap();
    assert_eq!(ended.id, first.id);
    assert!(ended.ended_at.is_some());
    assert!(queued_chat_ids(&state).await.is_empty());
    assert!(!game_service::current_game(&state).await.active);
    assert!(matches!(
        game_service::end_game(&state).await,
        Err(ServiceError::NoActiveSession)
    ));

    for chat_id in ["a4", "a1", "a2"] {
        registration::handle(&state, chat_id).await.unwrap();
    }
    let second = game_service::start_game(&state, start(&preset)).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(state.session_phase().await, SessionPhase::Active);
}

#[tokio::test]
async fn registration_logs_keep_the_most_recent_fifty() {
    let (state, _) = lobby().await;
    for attempt in 0..60 {
        registration::handle(&state, &format!("ghost{attempt}"))
            .await
            .unwrap();
    }

    let logs = admin_service::recent_logs(&state, None).await.unwrap();
    assert_eq!(logs.len(), 50);
    assert_eq!(logs[0].chat_id, "ghost59");
    assert_eq!(logs[49].chat_id, "ghost10");

    let five = admin_service::recent_logs(&state, Some(5)).await.unwrap();
    assert_eq!(five.len(), 5);
}

#[tokio::test]
async fn deleting_a_drafted_player_is_refused_while_the_game_runs() {
    let (state, _) = lobby().await;
    let mut drafted = Vec::new();
    for chat_id in ["a1", "a2", "a3"] {
        drafted.push(player(&state, chat_id, None).await);
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;
    game_service::start_game(&state, start(&preset)).await.unwrap();

    let err = admin_service::delete_player(&state, drafted[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    game_service::end_game(&state).await.unwrap();
    admin_service::delete_player(&state, drafted[0].id)
        .await
        .unwrap();
    assert_eq!(admin_service::list_players(&state).await.len(), 2);
}

#[tokio::test]
async fn writes_are_refused_while_degraded() {
    let (state, _) = lobby().await;
    player(&state, "alice", None).await;
    state.clear_store().await;

    let err = registration::handle(&state, "alice").await.unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));
    assert!(queued_chat_ids(&state).await.is_empty());
    assert_eq!(admin_service::list_players(&state).await.len(), 1);
}

#[tokio::test]
async fn no_card_is_sent_once_the_game_has_ended() {
    let messenger = Arc::new(GameEndingMessenger::default());
    let state = lobby_with(messenger.clone()).await;
    messenger.state.set(Arc::downgrade(&state)).unwrap();
    player(&state, "ann", Some("1001")).await;
    player(&state, "ben", Some("1002")).await;
    player(&state, "cat", Some("1003")).await;
    for chat_id in ["ann", "ben", "cat"] {
        registration::handle(&state, chat_id).await.unwrap();
    }
    let preset = trio(&state).await;
    game_service::start_game(&state, start(&preset)).await.unwrap();
    messenger.armed.store(true, Ordering::SeqCst);

    let report = game_service::send_cards(&state).await.unwrap();

    assert_eq!(state.session_phase().await, SessionPhase::Ended);
    assert!(messenger.sent.lock().unwrap().is_empty());
    assert_eq!((report.attempted, report.delivered, report.failed), (1, 0, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_queue_each_identity_once() {
    let (state, _) = lobby().await;
    let others = ["bob", "carol", "dan", "eve"];
    player(&state, "alice", None).await;
    for chat_id in others {
        player(&state, chat_id, None).await;
    }

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let state = state.clone();
        tasks.push(tokio::spawn(async move {
            registration::handle(&state, "alice").await
        }));
    }
    for chat_id in others {
        let state = state.clone();
        tasks.push(tokio::spawn(async move {
            registration::handle(&state, chat_id).await
        }));
    }

    let mut alice_statuses = Vec::new();
    for task in tasks {
        let entry = task.await.unwrap().unwrap();
        if entry.chat_id == "alice" {
            alice_statuses.push(entry.status);
        } else {
            assert_eq!(entry.status, RegistrationStatus::Success);
        }
    }

    let successes = alice_statuses
        .iter()
        .filter(|status| **status == RegistrationStatus::Success)
        .count();
    assert_eq!(successes, 1);
    assert!(
        alice_statuses
            .iter()
            .all(|status| matches!(
                status,
                RegistrationStatus::Success | RegistrationStatus::AlreadyQueued
            ))
    );

    let queued = queued_chat_ids(&state).await;
    assert_eq!(queued.len(), 5);
    assert_eq!(queued.iter().filter(|id| *id == "alice").count(), 1);

    let logs = admin_service::recent_logs(&state, None).await.unwrap();
    assert_eq!(logs.len(), 20);
    let counts = admin_service::registration_counts(&state).await.unwrap();
    assert_eq!((counts.successful, counts.already_queued), (5, 15));
}
