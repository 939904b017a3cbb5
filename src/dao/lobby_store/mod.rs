pub mod memory;
/// MongoDB implementation.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    GameSessionEntity, PlayerEntity, QueueEntryEntity, RegistrationLogEntity,
    RegistrationStatsEntity, RolePresetEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use self::memory::MemoryLobbyStore;

/// Durable mutation emitted by a committed lobby change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyChange {
    /// Insert or replace a player.
    UpsertPlayer(PlayerEntity),
    /// Remove a player.
    DeletePlayer(Uuid),
    /// Append a queue entry.
    InsertQueueEntry(QueueEntryEntity),
    /// Remove the queue entries of the given players (missing entries are ignored).
    DeleteQueueEntries(Vec<Uuid>),
    /// Remove every queue entry.
    ClearQueue,
    /// Insert or replace a preset.
    UpsertPreset(RolePresetEntity),
    /// Remove a preset.
    DeletePreset(Uuid),
    /// Insert or replace a game session.
    UpsertSession(GameSessionEntity),
}

/// Everything needed to rebuild the in-memory lobby at start-up.
#[derive(Debug, Clone, Default)]
pub struct LobbySnapshot {
    /// All registered players.
    pub players: Vec<PlayerEntity>,
    /// Queue entries in any order; consumers sort by sequence.
    pub queue: Vec<QueueEntryEntity>,
    /// All role presets.
    pub presets: Vec<RolePresetEntity>,
    /// Most recent session, whatever its status.
    pub session: Option<GameSessionEntity>,
}

/// Abstraction over the persistence layer for players, queue, presets, sessions and audit logs.
pub trait LobbyStore: Send + Sync {
    /// Load the persisted lobby.
    fn load_snapshot(&self) -> BoxFuture<'static, StorageResult<LobbySnapshot>>;
    /// Persist a batch of changes produced by a single lobby commit, in order.
    fn apply(&self, changes: Vec<LobbyChange>) -> BoxFuture<'static, StorageResult<()>>;
    /// Record a registration attempt and update the running totals.
    fn append_registration_log(
        &self,
        entry: RegistrationLogEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Most recent registration logs, newest first.
    fn recent_registration_logs(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<RegistrationLogEntity>>>;
    /// Totals per registration outcome.
    fn registration_stats(&self) -> BoxFuture<'static, StorageResult<RegistrationStatsEntity>>;
    /// Read a runtime setting.
    fn get_config(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Write a runtime setting.
    fn set_config(&self, key: String, value: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
