//! Private messaging sink used for role cards and registration acknowledgements.

use futures::future::BoxFuture;
use thiserror::Error;

/// Failure to deliver a private message.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// No bot credentials were provided at start-up.
    #[error("messaging bot is not configured")]
    NotConfigured,
    /// Transport error or timeout.
    #[error("messaging request failed")]
    Http(#[from] reqwest::Error),
    /// The platform answered but refused the call.
    #[error("messaging platform rejected the request: {description}")]
    Rejected {
        /// Reason given by the platform.
        description: String,
    },
}

/// Abstraction over the private messaging platform.
pub trait Messenger: Send + Sync {
    /// Deliver `text` to the private channel identified by `contact`.
    fn send_private_message(
        &self,
        contact: &str,
        text: &str,
    ) -> BoxFuture<'static, Result<(), MessengerError>>;

    /// Resolve a public `@username` into a numeric contact, when the platform knows it.
    fn resolve_contact(
        &self,
        username: &str,
    ) -> BoxFuture<'static, Result<Option<String>, MessengerError>>;

    /// Whether sends have any chance to succeed.
    fn is_available(&self) -> bool;
}

/// Sink installed when no bot token is configured; every send fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMessenger;

impl Messenger for DisabledMessenger {
    fn send_private_message(
        &self,
        _contact: &str,
        _text: &str,
    ) -> BoxFuture<'static, Result<(), MessengerError>> {
        Box::pin(async { Err(MessengerError::NotConfigured) })
    }

    fn resolve_contact(
        &self,
        _username: &str,
    ) -> BoxFuture<'static, Result<Option<String>, MessengerError>> {
        Box::pin(async { Err(MessengerError::NotConfigured) })
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Text of the private card announcing a drafted player's role.
pub fn role_card_text(nickname: &str, role: &str) -> String {
    format!("Your role: {role}\nNickname: {nickname}\n\nKeep it secret. Good luck!")
}

/// Text acknowledging a successful queue admission.
pub fn queue_ack_text(nickname: &str, position: usize) -> String {
    format!("{nickname}, you were added to the queue, position {position}.")
}
