use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{
    AssignmentEntity, GameSessionEntity, PlayerEntity, QueueEntryEntity, RegistrationLogEntity,
    RegistrationStatus, RolePresetEntity, SessionStatus,
};

/// Registered players.
pub const PLAYER_COLLECTION_NAME: &str = "players";
/// Waiting queue entries.
pub const QUEUE_COLLECTION_NAME: &str = "queue";
/// Role presets.
pub const PRESET_COLLECTION_NAME: &str = "role_presets";
/// Game sessions.
pub const SESSION_COLLECTION_NAME: &str = "sessions";
/// Registration attempts.
pub const LOG_COLLECTION_NAME: &str = "registration_logs";
/// Runtime settings.
pub const CONFIG_COLLECTION_NAME: &str = "config";

/// Stored player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: Binary,
    chat_id: String,
    nickname: String,
    contact_id: Option<String>,
    phone: Option<String>,
    created_at: DateTime,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            chat_id: value.chat_id,
            nickname: value.nickname,
            contact_id: value.contact_id,
            phone: value.phone,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoPlayerDocument> for PlayerEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPlayerDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: binary_as_uuid(PLAYER_COLLECTION_NAME, &value.id)?,
            chat_id: value.chat_id,
            nickname: value.nickname,
            contact_id: value.contact_id,
            phone: value.phone,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// Queue entries are keyed by player so the primary key doubles as the membership constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQueueDocument {
    #[serde(rename = "_id")]
    player_id: Binary,
    sequence: i64,
    added_at: DateTime,
}

impl From<QueueEntryEntity> for MongoQueueDocument {
    fn from(value: QueueEntryEntity) -> Self {
        Self {
            player_id: uuid_as_binary(value.player_id),
            sequence: i64::try_from(value.sequence).unwrap_or(i64::MAX),
            added_at: DateTime::from_system_time(value.added_at),
        }
    }
}

impl TryFrom<MongoQueueDocument> for QueueEntryEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoQueueDocument) -> Result<Self, Self::Error> {
        let sequence =
            u64::try_from(value.sequence).map_err(|_| MongoDaoError::CorruptDocument {
                collection: QUEUE_COLLECTION_NAME,
                reason: format!("negative sequence {}", value.sequence),
            })?;
        Ok(Self {
            player_id: binary_as_uuid(QUEUE_COLLECTION_NAME, &value.player_id)?,
            sequence,
            added_at: value.added_at.to_system_time(),
        })
    }
}

/// Stored role preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPresetDocument {
    #[serde(rename = "_id")]
    id: Binary,
    name: String,
    player_count: i64,
    roles: Vec<String>,
    created_at: DateTime,
}

impl From<RolePresetEntity> for MongoPresetDocument {
    fn from(value: RolePresetEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            name: value.name,
            player_count: i64::from(value.player_count),
            roles: value.roles,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoPresetDocument> for RolePresetEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPresetDocument) -> Result<Self, Self::Error> {
        let player_count =
            u32::try_from(value.player_count).map_err(|_| MongoDaoError::CorruptDocument {
                collection: PRESET_COLLECTION_NAME,
                reason: format!("invalid player count {}", value.player_count),
            })?;
        Ok(Self {
            id: binary_as_uuid(PRESET_COLLECTION_NAME, &value.id)?,
            name: value.name,
            player_count,
            roles: value.roles,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// Role card embedded in a session document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAssignmentDocument {
    id: Binary,
    player_id: Binary,
    nickname: String,
    role: String,
    delivered: bool,
}

/// Stored game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: Binary,
    preset_id: Binary,
    preset_name: String,
    roles: Vec<String>,
    status: SessionStatus,
    assignments: Vec<MongoAssignmentDocument>,
    created_at: DateTime,
    #[serde(default)]
    ended_at: Option<DateTime>,
}

impl From<GameSessionEntity> for MongoSessionDocument {
    fn from(value: GameSessionEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            preset_id: uuid_as_binary(value.preset_id),
            preset_name: value.preset_name,
            roles: value.roles,
            status: value.status,
            assignments: value
                .assignments
                .into_iter()
                .map(|assignment| MongoAssignmentDocument {
                    id: uuid_as_binary(assignment.id),
                    player_id: uuid_as_binary(assignment.player_id),
                    nickname: assignment.nickname,
                    role: assignment.role,
                    delivered: assignment.delivered,
                })
                .collect(),
            created_at: DateTime::from_system_time(value.created_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoSessionDocument> for GameSessionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSessionDocument) -> Result<Self, Self::Error> {
        let assignments = value
            .assignments
            .into_iter()
            .map(|assignment| {
                Ok(AssignmentEntity {
                    id: binary_as_uuid(SESSION_COLLECTION_NAME, &assignment.id)?,
                    player_id: binary_as_uuid(SESSION_COLLECTION_NAME, &assignment.player_id)?,
                    nickname: assignment.nickname,
                    role: assignment.role,
                    delivered: assignment.delivered,
                })
            })
            .collect::<Result<Vec<_>, MongoDaoError>>()?;

        Ok(Self {
            id: binary_as_uuid(SESSION_COLLECTION_NAME, &value.id)?,
            preset_id: binary_as_uuid(SESSION_COLLECTION_NAME, &value.preset_id)?,
            preset_name: value.preset_name,
            roles: value.roles,
            status: value.status,
            assignments,
            created_at: value.created_at.to_system_time(),
            ended_at: value.ended_at.map(|ended| ended.to_system_time()),
        })
    }
}

/// Stored registration attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRegistrationLogDocument {
    #[serde(rename = "_id")]
    id: Binary,
    player_id: Option<Binary>,
    chat_id: String,
    nickname: String,
    status: RegistrationStatus,
    message: String,
    created_at: DateTime,
}

impl From<RegistrationLogEntity> for MongoRegistrationLogDocument {
    fn from(value: RegistrationLogEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            player_id: value.player_id.map(uuid_as_binary),
            chat_id: value.chat_id,
            nickname: value.nickname,
            status: value.status,
            message: value.message,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoRegistrationLogDocument> for RegistrationLogEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRegistrationLogDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: binary_as_uuid(LOG_COLLECTION_NAME, &value.id)?,
            player_id: value
                .player_id
                .as_ref()
                .map(|id| binary_as_uuid(LOG_COLLECTION_NAME, id))
                .transpose()?,
            chat_id: value.chat_id,
            nickname: value.nickname,
            status: value.status,
            message: value.message,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// Runtime setting keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfigDocument {
    /// Setting name.
    #[serde(rename = "_id")]
    pub key: String,
    /// Raw value.
    pub value: String,
}

/// Encode a UUID as BSON binary subtype 4.
pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

fn binary_as_uuid(collection: &'static str, binary: &Binary) -> Result<Uuid, MongoDaoError> {
    Uuid::from_slice(&binary.bytes).map_err(|err| MongoDaoError::CorruptDocument {
        collection,
        reason: err.to_string(),
    })
}

/// `_id` filter for `id`.
pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
