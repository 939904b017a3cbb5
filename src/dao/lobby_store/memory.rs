//! In-process [`LobbyStore`] used by tests and by `STORAGE_BACKEND=memory` deployments.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    lobby_store::{LobbyChange, LobbySnapshot, LobbyStore},
    models::{
        GameSessionEntity, PlayerEntity, QueueEntryEntity, RegistrationLogEntity,
        RegistrationStatsEntity, RolePresetEntity,
    },
    storage::{StorageError, StorageResult},
};

/// Registration logs kept by default before the oldest are dropped.
const DEFAULT_LOG_RETENTION: usize = 50;

/// Store that keeps everything in process memory; contents are lost on restart.
#[derive(Clone)]
pub struct MemoryLobbyStore {
    inner: Arc<RwLock<MemoryTables>>,
    log_retention: usize,
}

#[derive(Debug, Clone, Default)]
struct MemoryTables {
    players: HashMap<Uuid, PlayerEntity>,
    queue: HashMap<Uuid, QueueEntryEntity>,
    presets: HashMap<Uuid, RolePresetEntity>,
    session: Option<GameSessionEntity>,
    logs: VecDeque<RegistrationLogEntity>,
    stats: RegistrationStatsEntity,
    config: HashMap<String, String>,
}

impl Default for MemoryLobbyStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_RETENTION)
    }
}

impl MemoryLobbyStore {
    /// Create an empty store keeping at most `log_retention` registration logs.
    pub fn new(log_retention: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryTables::default())),
            log_retention: log_retention.max(1),
        }
    }

    /// Create a store pre-populated with a snapshot.
    pub fn with_snapshot(snapshot: LobbySnapshot, log_retention: usize) -> Self {
        let tables = MemoryTables {
            players: snapshot.players.into_iter().map(|p| (p.id, p)).collect(),
            queue: snapshot
                .queue
                .into_iter()
                .map(|e| (e.player_id, e))
                .collect(),
            presets: snapshot.presets.into_iter().map(|p| (p.id, p)).collect(),
            session: snapshot.session,
            ..MemoryTables::default()
        };
        Self {
            inner: Arc::new(RwLock::new(tables)),
            log_retention: log_retention.max(1),
        }
    }
}

impl MemoryTables {
    fn apply_change(&mut self, change: LobbyChange) -> StorageResult<()> {
        match change {
            LobbyChange::UpsertPlayer(player) => {
                if self
                    .players
                    .values()
                    .any(|existing| existing.chat_id == player.chat_id && existing.id != player.id)
                {
                    return Err(StorageError::conflict(format!(
                        "chat identity `{}` is already registered",
                        player.chat_id
                    )));
                }
                self.players.insert(player.id, player);
            }
            LobbyChange::DeletePlayer(id) => {
                self.players.remove(&id);
                self.queue.remove(&id);
            }
            LobbyChange::InsertQueueEntry(entry) => {
                if self.queue.contains_key(&entry.player_id) {
                    return Err(StorageError::conflict(format!(
                        "player `{}` is already queued",
                        entry.player_id
                    )));
                }
                self.queue.insert(entry.player_id, entry);
            }
            LobbyChange::DeleteQueueEntries(ids) => {
                for id in ids {
                    self.queue.remove(&id);
                }
            }
            LobbyChange::ClearQueue => self.queue.clear(),
            LobbyChange::UpsertPreset(preset) => {
                if self
                    .presets
                    .values()
                    .any(|existing| existing.name == preset.name && existing.id != preset.id)
                {
                    return Err(StorageError::conflict(format!(
                        "preset `{}` already exists",
                        preset.name
                    )));
                }
                self.presets.insert(preset.id, preset);
            }
            LobbyChange::DeletePreset(id) => {
                self.presets.remove(&id);
            }
            LobbyChange::UpsertSession(session) => self.session = Some(session),
        }
        Ok(())
    }
}

impl LobbyStore for MemoryLobbyStore {
    fn load_snapshot(&self) -> BoxFuture<'static, StorageResult<LobbySnapshot>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            Ok(LobbySnapshot {
                players: tables.players.values().cloned().collect(),
                queue: tables.queue.values().cloned().collect(),
                presets: tables.presets.values().cloned().collect(),
                session: tables.session.clone(),
            })
        })
    }

    fn apply(&self, changes: Vec<LobbyChange>) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            // Work on a copy so a rejected change leaves the tables untouched.
            let mut draft = tables.clone();
            for change in changes {
                draft.apply_change(change)?;
            }
            *tables = draft;
            Ok(())
        })
    }

    fn append_registration_log(
        &self,
        entry: RegistrationLogEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let retention = self.log_retention;
        Box::pin(async move {
            let mut tables = inner.write().await;
            tables.stats.record(entry.status);
            tables.logs.push_front(entry);
            tables.logs.truncate(retention);
            Ok(())
        })
    }

    fn recent_registration_logs(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<RegistrationLogEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            Ok(tables.logs.iter().take(limit).cloned().collect())
        })
    }

    fn registration_stats(&self) -> BoxFuture<'static, StorageResult<RegistrationStatsEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.stats) })
    }

    fn get_config(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.config.get(&key).cloned()) })
    }

    fn set_config(&self, key: String, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.config.insert(key, value);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::RegistrationStatus;

    fn player(chat_id: &str) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            chat_id: chat_id.into(),
            nickname: chat_id.to_uppercase(),
            contact_id: None,
            phone: None,
            created_at: SystemTime::now(),
        }
    }

    fn log(status: RegistrationStatus) -> RegistrationLogEntity {
        RegistrationLogEntity {
            id: Uuid::new_v4(),
            player_id: None,
            chat_id: "someone".into(),
            nickname: "someone".into(),
            status,
            message: String::new(),
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn rejected_batch_leaves_tables_untouched() {
        let store = MemoryLobbyStore::default();
        let alice = player("alice");
        let entry = QueueEntryEntity {
            player_id: alice.id,
            sequence: 1,
            added_at: SystemTime::now(),
        };
        store
            .apply(vec![
                LobbyChange::UpsertPlayer(alice.clone()),
                LobbyChange::InsertQueueEntry(entry.clone()),
            ])
            .await
            .unwrap();

        let err = store
            .apply(vec![
                LobbyChange::ClearQueue,
                LobbyChange::UpsertPlayer(player("alice")),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));

        let snapshot = store.load_snapshot().await.unwrap();
        assert_eq!(snapshot.queue, vec![entry]);
        assert_eq!(snapshot.players, vec![alice]);
    }

    #[tokio::test]
    async fn duplicate_queue_entry_is_a_conflict() {
        let store = MemoryLobbyStore::default();
        let id = Uuid::new_v4();
        let entry = |sequence| QueueEntryEntity {
            player_id: id,
            sequence,
            added_at: SystemTime::now(),
        };
        store
            .apply(vec![LobbyChange::InsertQueueEntry(entry(1))])
            .await
            .unwrap();
        let err = store
            .apply(vec![LobbyChange::InsertQueueEntry(entry(2))])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }

    #[tokio::test]
    async fn registration_logs_are_bounded_but_stats_are_not() {
        let store = MemoryLobbyStore::new(2);
        for _ in 0..3 {
            store
                .append_registration_log(log(RegistrationStatus::Failed))
                .await
                .unwrap();
        }
        store
            .append_registration_log(log(RegistrationStatus::Success))
            .await
            .unwrap();

        let logs = store.recent_registration_logs(50).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, RegistrationStatus::Success);

        let stats = store.registration_stats().await.unwrap();
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.successful, 1);
    }
}
