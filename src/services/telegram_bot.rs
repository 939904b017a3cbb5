//! Self-service registration through the Telegram bot (`/start`, `/help`, `/reg`).

use std::time::{Duration, SystemTime};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dto::validation::validate_chat_id,
    error::ServiceError,
    services::telegram::{IncomingMessage, TelegramClient},
    state::{SharedState, roster::NewPlayer},
};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

const WELCOME_TEXT: &str = "Hi! I am the Mafia lobby bot for the livestream games.\n\n\
To take part, link your livestream account:\n\
/reg <chat_id> <nickname>\n\n\
Example:\n/reg mafia_fan_123 VasyaGamer\n\n\
Then type !reg in the livestream chat to join the queue.";

const HELP_TEXT: &str = "Commands:\n\
/start - welcome message\n\
/help - this list\n\
/reg <chat_id> <nickname> - link your livestream account";

const USAGE_TEXT: &str = "Usage: /reg <chat_id> <nickname>";

/// Parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/reg <chat_id> <nickname>`
    Register {
        /// Chat identity to link the contact to.
        chat_id: String,
        /// Display name for the lobby.
        nickname: String,
    },
    /// `/reg` with missing or malformed arguments.
    RegisterUsage,
}

/// Parse a message text; non-command texts yield `None`.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let text = text.trim();
    let (head, rest) = text
        .split_once(char::is_whitespace)
        .map(|(head, rest)| (head, rest.trim()))
        .unwrap_or((text, ""));
    // Group chats address commands as `/reg@bot_name`.
    let command = head.split('@').next().unwrap_or(head);

    match command {
        "/start" => Some(BotCommand::Start),
        "/help" => Some(BotCommand::Help),
        "/reg" => {
            let Some((chat_id, nickname)) = rest.split_once(char::is_whitespace) else {
                return Some(BotCommand::RegisterUsage);
            };
            let chat_id = chat_id.trim_start_matches('@');
            let nickname = nickname.trim();
            if nickname.is_empty() || validate_chat_id(chat_id).is_err() {
                return Some(BotCommand::RegisterUsage);
            }
            Some(BotCommand::Register {
                chat_id: chat_id.to_owned(),
                nickname: nickname.to_owned(),
            })
        }
        _ => None,
    }
}

/// Reply to `command` sent from messaging `contact`.
pub async fn respond(state: &SharedState, contact: &str, command: BotCommand) -> String {
    match command {
        BotCommand::Start => WELCOME_TEXT.to_owned(),
        BotCommand::Help => HELP_TEXT.to_owned(),
        BotCommand::RegisterUsage => USAGE_TEXT.to_owned(),
        BotCommand::Register { chat_id, nickname } => {
            register(state, contact, chat_id, nickname).await
        }
    }
}

async fn register(state: &SharedState, contact: &str, chat_id: String, nickname: String) -> String {
    let existing = state
        .read_lobby(|lobby| {
            lobby
                .roster()
                .find_by_contact(contact)
                .map(|player| player.nickname.clone())
        })
        .await;
    if let Some(nickname) = existing {
        return format!(
            "You are already registered as {nickname}.\n\nAsk an admin to change your details."
        );
    }

    let new = NewPlayer {
        chat_id,
        nickname,
        contact_id: Some(contact.to_owned()),
        phone: None,
    };
    match state
        .mutate(|lobby| lobby.create_player(new, SystemTime::now()))
        .await
    {
        Ok(player) => {
            info!(player_id = %player.id, chat_id = %player.chat_id, "player registered through the bot");
            format!(
                "Registration complete!\n\nNickname: {}\nChat ID: {}\n\nNow type !reg in the livestream chat to join the game.",
                player.nickname, player.chat_id
            )
        }
        Err(ServiceError::Conflict(message)) => {
            format!("Registration refused: {message}.")
        }
        Err(ServiceError::Degraded | ServiceError::Unavailable(_)) => {
            "Registration is temporarily unavailable, please try again later.".to_owned()
        }
        Err(err) => {
            warn!(error = %err, "bot registration failed");
            "Registration failed, please check your details.".to_owned()
        }
    }
}

/// Long-poll the bot updates forever, answering commands.
pub async fn run(state: SharedState, client: TelegramClient) {
    info!("telegram bot polling started");
    let mut offset = 0;
    loop {
        match client.get_updates(offset).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(message) = update.message {
                        handle_message(&state, &client, message).await;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "telegram polling failed");
                sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}

async fn handle_message(state: &SharedState, client: &TelegramClient, message: IncomingMessage) {
    let Some(command) = message.text.as_deref().and_then(parse_command) else {
        return;
    };
    let contact = message
        .from
        .as_ref()
        .map(|user| user.id)
        .unwrap_or(message.chat.id)
        .to_string();

    let reply = respond(state, &contact, command).await;
    if let Err(err) = client
        .send_message(&message.chat.id.to_string(), &reply)
        .await
    {
        warn!(error = %err, "failed to answer bot command");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_command("/start"), Some(BotCommand::Start));
        assert_eq!(parse_command("/help@mafia_bot"), Some(BotCommand::Help));
        assert_eq!(
            parse_command("/reg @mafia_fan_123  Vasya Gamer "),
            Some(BotCommand::Register {
                chat_id: "mafia_fan_123".into(),
                nickname: "Vasya Gamer".into(),
            })
        );
    }

    #[test]
    fn incomplete_registration_shows_usage() {
        assert_eq!(parse_command("/reg"), Some(BotCommand::RegisterUsage));
        assert_eq!(parse_command("/reg onlyid"), Some(BotCommand::RegisterUsage));
    }

    #[test]
    fn plain_text_is_ignored() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("!reg"), None);
    }
}
