//! Telegram Bot API client backing the [`Messenger`] sink and the registration bot.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::services::messenger::{Messenger, MessengerError};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Long-poll window requested from `getUpdates`.
pub const POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Entry of a `getUpdates` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id used as the polling offset.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    pub message: Option<IncomingMessage>,
}

/// Message sent to the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Chat the message came from.
    pub chat: ChatRef,
    /// Sender.
    pub from: Option<User>,
    /// Message text, if any.
    pub text: Option<String>,
}

/// Chat reference.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRef {
    /// Chat id; equals the user id for private chats.
    pub id: i64,
}

/// Message author.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// User id.
    pub id: i64,
    /// Public `@username` without the `@`.
    pub username: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct GetChat<'a> {
    chat_id: &'a str,
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Thin Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: Arc<str>,
}

impl TelegramClient {
    /// Client for the public Bot API.
    pub fn new(token: &str) -> Result<Self, MessengerError> {
        Self::with_base_url(DEFAULT_API_BASE, token)
    }

    /// Client talking to a Bot API compatible server at `api_base`.
    pub fn with_base_url(api_base: &str, token: &str) -> Result<Self, MessengerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()?;
        let base_url = Arc::<str>::from(format!(
            "{}/bot{}",
            api_base.trim_end_matches('/'),
            token
        ));
        Ok(Self { client, base_url })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, MessengerError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        let response: ApiResponse<T> = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(MessengerError::Rejected {
                description: description.unwrap_or_else(|| format!("{method} failed")),
            }),
        }
    }

    /// Send a plain text message.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), MessengerError> {
        self.call::<_, serde_json::Value>("sendMessage", &SendMessage { chat_id, text })
            .await
            .map(|_| ())
    }

    /// Numeric id of the chat behind `@username`, if the bot can see it.
    pub async fn get_chat_id(&self, username: &str) -> Result<Option<String>, MessengerError> {
        match self
            .call::<_, ChatRef>("getChat", &GetChat { chat_id: username })
            .await
        {
            Ok(chat) => Ok(Some(chat.id.to_string())),
            Err(MessengerError::Rejected { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Long-poll for message updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, MessengerError> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: POLL_TIMEOUT_SECS,
                allowed_updates: ["message"],
            },
        )
        .await
    }
}

impl Messenger for TelegramClient {
    fn send_private_message(
        &self,
        contact: &str,
        text: &str,
    ) -> BoxFuture<'static, Result<(), MessengerError>> {
        let this = self.clone();
        let contact = contact.to_owned();
        let text = text.to_owned();
        Box::pin(async move { this.send_message(&contact, &text).await })
    }

    fn resolve_contact(
        &self,
        username: &str,
    ) -> BoxFuture<'static, Result<Option<String>, MessengerError>> {
        let this = self.clone();
        let username = if username.starts_with('@') {
            username.to_owned()
        } else {
            format!("@{username}")
        };
        Box::pin(async move { this.get_chat_id(&username).await })
    }

    fn is_available(&self) -> bool {
        true
    }
}
