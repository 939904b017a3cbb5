//! Chat listener behaviour against a scripted connector.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use futures::{StreamExt, future::BoxFuture, stream};
use tokio::{sync::mpsc, time::sleep};

use mafia_lobby_back::services::chat_listener::{
    ChatConnector, ChatError, ChatListener, ChatMessage, ChatStatus, ChatStream, ListenerPolicy,
    RegistrationIntent,
};

/// Replays one scripted session per connection attempt; attempts past the script fail.
#[derive(Default)]
struct ScriptedConnector {
    attempts: AtomicU32,
    sessions: Mutex<VecDeque<Vec<Result<ChatMessage, ChatError>>>>,
}

impl ScriptedConnector {
    fn with_sessions(sessions: Vec<Vec<Result<ChatMessage, ChatError>>>) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            sessions: Mutex::new(sessions.into()),
        }
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ChatConnector for ScriptedConnector {
    fn connect(&self, _channel: &str) -> BoxFuture<'static, Result<ChatStream, ChatError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let session = self.sessions.lock().unwrap().pop_front();
        Box::pin(async move {
            match session {
                Some(items) => Ok(stream::iter(items).boxed()),
                None => Err(ChatError::Connect("refused".into())),
            }
        })
    }
}

fn say(user: &str, text: &str) -> Result<ChatMessage, ChatError> {
    Ok(ChatMessage {
        user: user.into(),
        text: text.into(),
    })
}

fn policy(max_attempts: u32) -> ListenerPolicy {
    ListenerPolicy {
        registration_command: "!reg".into(),
        reconnect_delay: Duration::from_millis(10),
        max_attempts,
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn only_the_registration_command_is_forwarded() {
    let connector = Arc::new(ScriptedConnector::with_sessions(vec![vec![
        say("alice", "hello"),
        say("alice", " !REG "),
        say("bob", "!reg now"),
        say("carol", "!reg"),
    ]]));
    let (tx, mut rx) = mpsc::channel(8);
    let listener = ChatListener::new(connector.clone(), policy(1), tx);

    listener.connect("stream".into()).await;

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(
        [first, second],
        [
            RegistrationIntent {
                chat_id: "alice".into()
            },
            RegistrationIntent {
                chat_id: "carol".into()
            },
        ]
    );
    assert_eq!(listener.channel().await.as_deref(), Some("stream"));
}

#[tokio::test]
async fn reconnection_stops_after_the_attempt_budget() {
    let connector = Arc::new(ScriptedConnector::default());
    let (tx, _rx) = mpsc::channel(8);
    let listener = ChatListener::new(connector.clone(), policy(3), tx);

    listener.connect("stream".into()).await;

    wait_until(|| connector.attempts() == 3).await;
    sleep(Duration::from_millis(60)).await;
    assert_eq!(connector.attempts(), 3);
    assert_eq!(listener.status(), ChatStatus::Disconnected);
}

#[tokio::test]
async fn a_successful_connection_resets_the_budget() {
    let connector = Arc::new(ScriptedConnector::with_sessions(vec![
        vec![say("alice", "!reg")],
        vec![Err(ChatError::Stream("reset".into()))],
    ]));
    let (tx, mut rx) = mpsc::channel(8);
    let listener = ChatListener::new(connector.clone(), policy(2), tx);

    listener.connect("stream".into()).await;
    assert_eq!(rx.recv().await.unwrap().chat_id, "alice");

    // Each scripted session ends in one failure; only the refusal after the second one
    // leaves two consecutive failures.
    wait_until(|| connector.attempts() == 3).await;
    sleep(Duration::from_millis(60)).await;
    assert_eq!(connector.attempts(), 3);
    assert_eq!(listener.status(), ChatStatus::Disconnected);
}

#[tokio::test]
async fn disconnect_stops_retrying() {
    let connector = Arc::new(ScriptedConnector::default());
    let (tx, _rx) = mpsc::channel(8);
    let listener = ChatListener::new(connector.clone(), policy(1_000), tx);

    listener.connect("stream".into()).await;
    wait_until(|| connector.attempts() >= 1).await;
    listener.disconnect().await;
    let seen = connector.attempts();

    sleep(Duration::from_millis(60)).await;
    assert!(connector.attempts() <= seen + 1);
    assert_eq!(listener.status(), ChatStatus::Disconnected);
}
