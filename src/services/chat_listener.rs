//! Long-lived listener bridging livestream chat messages into registration intents.

use std::{sync::Arc, time::Duration};

use futures::{
    StreamExt,
    future::BoxFuture,
    stream::BoxStream,
};
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

/// One chat line received from the livestream platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Platform identity of the author.
    pub user: String,
    /// Message body.
    pub text: String,
}

/// Failure of a chat connection.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Could not open the connection.
    #[error("failed to connect to chat: {0}")]
    Connect(String),
    /// An open connection broke.
    #[error("chat stream failed: {0}")]
    Stream(String),
}

/// Connectivity of the chat listener as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// Not listening.
    Disconnected,
    /// Opening a connection or waiting to retry.
    Connecting,
    /// Receiving messages.
    Connected,
}

/// Messages of one chat connection; ends when the connection closes.
pub type ChatStream = BoxStream<'static, Result<ChatMessage, ChatError>>;

/// Opens a message stream for a livestream channel.
pub trait ChatConnector: Send + Sync {
    /// Open a stream for `channel`.
    fn connect(&self, channel: &str) -> BoxFuture<'static, Result<ChatStream, ChatError>>;
}

/// A chat author asked for a queue slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationIntent {
    /// Platform identity of the author.
    pub chat_id: String,
}

/// Exact match of the registration command, ignoring surrounding whitespace and case.
pub fn is_registration_command(text: &str, command: &str) -> bool {
    text.trim().to_lowercase() == command.trim().to_lowercase()
}

/// Reconnection and filtering rules of a [`ChatListener`].
#[derive(Debug, Clone)]
pub struct ListenerPolicy {
    /// Command text that requests a queue slot.
    pub registration_command: String,
    /// Pause between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed cycles tolerated before giving up.
    pub max_attempts: u32,
}

/// Owns the background connection task; cheap to clone.
#[derive(Clone)]
pub struct ChatListener {
    inner: Arc<ListenerInner>,
}

struct ListenerInner {
    connector: Arc<dyn ChatConnector>,
    intents: mpsc::Sender<RegistrationIntent>,
    status: watch::Sender<ChatStatus>,
    policy: ListenerPolicy,
    running: Mutex<Option<RunningListener>>,
}

struct RunningListener {
    channel: String,
    handle: JoinHandle<()>,
}

impl ChatListener {
    /// Idle listener; call [`ChatListener::connect`] to start.
    pub fn new(
        connector: Arc<dyn ChatConnector>,
        policy: ListenerPolicy,
        intents: mpsc::Sender<RegistrationIntent>,
    ) -> Self {
        let (status, _rx) = watch::channel(ChatStatus::Disconnected);
        Self {
            inner: Arc::new(ListenerInner {
                connector,
                intents,
                status,
                policy,
                running: Mutex::new(None),
            }),
        }
    }

    /// Current connectivity.
    pub fn status(&self) -> ChatStatus {
        *self.inner.status.borrow()
    }

    /// Watch connectivity changes.
    pub fn subscribe(&self) -> watch::Receiver<ChatStatus> {
        self.inner.status.subscribe()
    }

    /// Channel of the current (or last) listening task.
    pub async fn channel(&self) -> Option<String> {
        self.inner
            .running
            .lock()
            .await
            .as_ref()
            .map(|running| running.channel.clone())
    }

    /// Start listening to `channel`, replacing any previous connection and resetting the
    /// retry budget.
    pub async fn connect(&self, channel: String) {
        let mut running = self.inner.running.lock().await;
        if let Some(previous) = running.take() {
            previous.handle.abort();
        }

        info!(channel = %channel, "starting chat listener");
        self.inner.status.send_replace(ChatStatus::Connecting);
        let handle = tokio::spawn(listen(self.inner.clone(), channel.clone()));
        *running = Some(RunningListener { channel, handle });
    }

    /// Stop the listening task, if any.
    pub async fn disconnect(&self) {
        if let Some(previous) = self.inner.running.lock().await.take() {
            previous.handle.abort();
            info!(channel = %previous.channel, "chat listener stopped");
        }
        self.inner.status.send_replace(ChatStatus::Disconnected);
    }
}

async fn listen(inner: Arc<ListenerInner>, channel: String) {
    let policy = &inner.policy;
    let mut failures: u32 = 0;

    loop {
        inner.status.send_replace(ChatStatus::Connecting);
        match inner.connector.connect(&channel).await {
            Ok(mut stream) => {
                info!(channel = %channel, "connected to chat");
                inner.status.send_replace(ChatStatus::Connected);
                failures = 0;

                while let Some(next) = stream.next().await {
                    match next {
                        Ok(message) => {
                            if !is_registration_command(&message.text, &policy.registration_command)
                            {
                                continue;
                            }
                            debug!(user = %message.user, "registration command received");
                            let intent = RegistrationIntent {
                                chat_id: message.user,
                            };
                            if inner.intents.send(intent).await.is_err() {
                                warn!("registration receiver dropped; stopping chat listener");
                                inner.status.send_replace(ChatStatus::Disconnected);
                                return;
                            }
                        }
                        Err(err) => {
                            warn!(channel = %channel, error = %err, "chat stream error");
                            break;
                        }
                    }
                }
                warn!(channel = %channel, "chat stream disconnected");
            }
            Err(err) => {
                warn!(channel = %channel, error = %err, "failed connecting to chat");
            }
        }

        inner.status.send_replace(ChatStatus::Disconnected);
        failures += 1;
        if failures >= policy.max_attempts {
            error!(
                channel = %channel,
                attempts = failures,
                "giving up on chat reconnection"
            );
            return;
        }
        info!(
            channel = %channel,
            attempt = failures,
            max_attempts = policy.max_attempts,
            delay_ms = policy.reconnect_delay.as_millis() as u64,
            "reconnecting to chat"
        );
        sleep(policy.reconnect_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_match_is_trimmed_and_case_insensitive() {
        assert!(is_registration_command("!reg", "!reg"));
        assert!(is_registration_command("  !REG \n", "!reg"));
        assert!(!is_registration_command("!reg please", "!reg"));
        assert!(!is_registration_command("reg", "!reg"));
        assert!(!is_registration_command("", "!reg"));
    }
}
