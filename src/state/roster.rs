use std::time::SystemTime;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::PlayerEntity;

/// Registered viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Player identifier.
    pub id: Uuid,
    /// Live-chat identity, unique and immutable.
    pub chat_id: String,
    /// Display name.
    pub nickname: String,
    /// Private messaging contact used to deliver role cards.
    pub contact_id: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Registration time.
    pub created_at: SystemTime,
}

/// Fields accepted when registering a player.
#[derive(Debug, Clone, Default)]
pub struct NewPlayer {
    /// Identity on the livestream chat.
    pub chat_id: String,
    /// Display name.
    pub nickname: String,
    /// Messaging id for role cards.
    pub contact_id: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
}

/// Mutable fields of a player; the chat identity is not part of it.
#[derive(Debug, Clone, Default)]
pub struct PlayerChanges {
    /// Display name.
    pub nickname: String,
    /// Messaging id; `None` clears it.
    pub contact_id: Option<String>,
    /// Phone number; `None` clears it.
    pub phone: Option<String>,
}

/// Player registry rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// Unknown player.
    #[error("player `{0}` not found")]
    NotFound(Uuid),
    /// Another player has this chat identity.
    #[error("chat identity `{0}` is already registered")]
    DuplicateChatId(String),
    /// Another player has this messaging contact.
    #[error("contact is already registered as {nickname}")]
    ContactTaken {
        /// Nickname of the player already holding the contact.
        nickname: String,
    },
    /// A required field is blank.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Registered players, unique by chat identity and contact.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: IndexMap<Uuid, Player>,
}

impl Roster {
    /// Build the roster from persisted players, oldest first.
    pub fn from_players(mut players: Vec<Player>) -> Self {
        players.sort_by_key(|player| player.created_at);
        Self {
            players: players
                .into_iter()
                .map(|player| (player.id, player))
                .collect(),
        }
    }

    /// Look up a player.
    pub fn get(&self, id: &Uuid) -> Result<&Player, RosterError> {
        self.players.get(id).ok_or(RosterError::NotFound(*id))
    }

    /// Player registered under `chat_id`.
    pub fn find_by_chat_id(&self, chat_id: &str) -> Option<&Player> {
        self.players
            .values()
            .find(|player| player.chat_id == chat_id)
    }

    /// Player owning the messaging contact.
    pub fn find_by_contact(&self, contact_id: &str) -> Option<&Player> {
        self.players
            .values()
            .find(|player| player.contact_id.as_deref() == Some(contact_id))
    }

    /// Players in registration order.
    pub fn list(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Register a player after checking both uniqueness rules.
    pub fn create(&mut self, new: NewPlayer, now: SystemTime) -> Result<Player, RosterError> {
        let chat_id = required(&new.chat_id, "chat identity")?;
        let nickname = required(&new.nickname, "nickname")?;
        if self.find_by_chat_id(&chat_id).is_some() {
            return Err(RosterError::DuplicateChatId(chat_id));
        }

        let contact_id = optional(new.contact_id);
        if let Some(contact) = contact_id.as_deref()
            && let Some(existing) = self.find_by_contact(contact)
        {
            return Err(RosterError::ContactTaken {
                nickname: existing.nickname.clone(),
            });
        }

        let player = Player {
            id: Uuid::new_v4(),
            chat_id,
            nickname,
            contact_id,
            phone: optional(new.phone),
            created_at: now,
        };
        self.players.insert(player.id, player.clone());
        Ok(player)
    }

    /// Apply `changes`; the chat identity never changes.
    pub fn update(&mut self, id: &Uuid, changes: PlayerChanges) -> Result<Player, RosterError> {
        let nickname = required(&changes.nickname, "nickname")?;
        let contact_id = optional(changes.contact_id);
        if let Some(contact) = contact_id.as_deref()
            && let Some(existing) = self.find_by_contact(contact)
            && existing.id != *id
        {
            return Err(RosterError::ContactTaken {
                nickname: existing.nickname.clone(),
            });
        }

        let player = self.players.get_mut(id).ok_or(RosterError::NotFound(*id))?;
        player.nickname = nickname;
        player.contact_id = contact_id;
        player.phone = optional(changes.phone);
        Ok(player.clone())
    }

    /// Remove a player; `None` when unknown.
    pub fn remove(&mut self, id: &Uuid) -> Option<Player> {
        self.players.shift_remove(id)
    }
}

fn required(value: &str, field: &'static str) -> Result<String, RosterError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RosterError::EmptyField(field));
    }
    Ok(trimmed.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            chat_id: value.chat_id,
            nickname: value.nickname,
            contact_id: value.contact_id,
            phone: value.phone,
            created_at: value.created_at,
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(value: Player) -> Self {
        Self {
            id: value.id,
            chat_id: value.chat_id,
            nickname: value.nickname,
            contact_id: value.contact_id,
            phone: value.phone,
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_player(chat_id: &str, contact: Option<&str>) -> NewPlayer {
        NewPlayer {
            chat_id: chat_id.into(),
            nickname: format!("{chat_id}-nick"),
            contact_id: contact.map(Into::into),
            phone: None,
        }
    }

    #[test]
    fn chat_identity_is_unique() {
        let mut roster = Roster::default();
        roster
            .create(new_player("alice", None), SystemTime::now())
            .unwrap();
        let err = roster
            .create(new_player(" alice ", None), SystemTime::now())
            .unwrap_err();
        assert_eq!(err, RosterError::DuplicateChatId("alice".into()));
    }

    #[test]
    fn a_contact_can_only_back_one_player() {
        let mut roster = Roster::default();
        roster
            .create(new_player("alice", Some("42")), SystemTime::now())
            .unwrap();
        let err = roster
            .create(new_player("bob", Some("42")), SystemTime::now())
            .unwrap_err();
        assert_eq!(
            err,
            RosterError::ContactTaken {
                nickname: "alice-nick".into()
            }
        );
    }

    #[test]
    fn update_keeps_chat_identity_and_clears_blank_fields() {
        let mut roster = Roster::default();
        let player = roster
            .create(new_player("alice", Some("42")), SystemTime::now())
            .unwrap();

        let updated = roster
            .update(
                &player.id,
                PlayerChanges {
                    nickname: "Alice".into(),
                    contact_id: Some("  ".into()),
                    phone: Some("+100".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.chat_id, "alice");
        assert_eq!(updated.nickname, "Alice");
        assert_eq!(updated.contact_id, None);
        assert_eq!(updated.phone.as_deref(), Some("+100"));
    }

    #[test]
    fn blank_nickname_is_rejected() {
        let mut roster = Roster::default();
        let err = roster
            .create(
                NewPlayer {
                    chat_id: "alice".into(),
                    nickname: " ".into(),
                    ..NewPlayer::default()
                },
                SystemTime::now(),
            )
            .unwrap_err();
        assert_eq!(err, RosterError::EmptyField("nickname"));
    }
}
