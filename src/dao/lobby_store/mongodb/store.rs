use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        CONFIG_COLLECTION_NAME, LOG_COLLECTION_NAME, MongoConfigDocument, MongoPlayerDocument,
        MongoPresetDocument, MongoQueueDocument, MongoRegistrationLogDocument,
        MongoSessionDocument, PLAYER_COLLECTION_NAME, PRESET_COLLECTION_NAME,
        QUEUE_COLLECTION_NAME, SESSION_COLLECTION_NAME, doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    lobby_store::{LobbyChange, LobbySnapshot, LobbyStore},
    models::{RegistrationLogEntity, RegistrationStatsEntity, RegistrationStatus},
    storage::StorageResult,
};

/// Collection holding the lifetime registration counters.
const STATS_COLLECTION_NAME: &str = "registration_stats";
const STATS_DOCUMENT_ID: &str = "registration";

/// [`LobbyStore`] backed by MongoDB.
#[derive(Clone)]
pub struct MongoLobbyStore {
    inner: Arc<MongoInner>,
    log_retention: usize,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoLobbyStore {
    /// Establish a connection to MongoDB and ensure the unique indexes are present.
    pub async fn connect(config: MongoConfig, log_retention: usize) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self {
            inner,
            log_retention: log_retention.max(1),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let indexes: [(&'static str, &'static str, &str, bool); 4] = [
            (PLAYER_COLLECTION_NAME, "chat_id", "player_chat_id_idx", true),
            (PRESET_COLLECTION_NAME, "name", "preset_name_idx", true),
            (QUEUE_COLLECTION_NAME, "sequence", "queue_sequence_idx", true),
            (LOG_COLLECTION_NAME, "created_at", "log_created_at_idx", false),
        ];

        // Queue documents are keyed by player id, so `_id` already enforces one entry per player.
        for (collection, field, name, unique) in indexes {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .unique(Some(unique))
                        .build(),
                )
                .build();

            database
                .collection::<Document>(collection)
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: field,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn find_all<T>(&self, name: &'static str) -> MongoResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send + Sync + Unpin,
    {
        self.collection::<T>(name)
            .await
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::read(name, source))?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::read(name, source))
    }

    async fn load_snapshot(&self) -> MongoResult<LobbySnapshot> {
        let players = self
            .find_all::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<MongoResult<Vec<_>>>()?;
        let queue = self
            .find_all::<MongoQueueDocument>(QUEUE_COLLECTION_NAME)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<MongoResult<Vec<_>>>()?;
        let presets = self
            .find_all::<MongoPresetDocument>(PRESET_COLLECTION_NAME)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<MongoResult<Vec<_>>>()?;

        let session = self
            .collection::<MongoSessionDocument>(SESSION_COLLECTION_NAME)
            .await
            .find_one(doc! {})
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|source| MongoDaoError::read(SESSION_COLLECTION_NAME, source))?
            .map(TryInto::try_into)
            .transpose()?;

        Ok(LobbySnapshot {
            players,
            queue,
            presets,
            session,
        })
    }

    /// Writes are issued in order; MongoDB offers no multi-collection atomicity without a
    /// replica set, so a failure part-way leaves earlier writes in place.
    async fn apply(&self, changes: Vec<LobbyChange>) -> MongoResult<()> {
        for change in changes {
            self.apply_change(change).await?;
        }
        Ok(())
    }

    async fn apply_change(&self, change: LobbyChange) -> MongoResult<()> {
        match change {
            LobbyChange::UpsertPlayer(player) => {
                let id = player.id;
                let document: MongoPlayerDocument = player.into();
                self.collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
                    .await
                    .replace_one(doc_id(id), &document)
                    .upsert(true)
                    .await
                    .map_err(|source| MongoDaoError::write(PLAYER_COLLECTION_NAME, source))?;
            }
            LobbyChange::DeletePlayer(id) => {
                self.collection::<Document>(PLAYER_COLLECTION_NAME)
                    .await
                    .delete_one(doc_id(id))
                    .await
                    .map_err(|source| MongoDaoError::write(PLAYER_COLLECTION_NAME, source))?;
                self.collection::<Document>(QUEUE_COLLECTION_NAME)
                    .await
                    .delete_one(doc_id(id))
                    .await
                    .map_err(|source| MongoDaoError::write(QUEUE_COLLECTION_NAME, source))?;
            }
            LobbyChange::InsertQueueEntry(entry) => {
                let document: MongoQueueDocument = entry.into();
                self.collection::<MongoQueueDocument>(QUEUE_COLLECTION_NAME)
                    .await
                    .insert_one(&document)
                    .await
                    .map_err(|source| MongoDaoError::write(QUEUE_COLLECTION_NAME, source))?;
            }
            LobbyChange::DeleteQueueEntries(ids) => {
                if ids.is_empty() {
                    return Ok(());
                }
                let ids: Vec<Bson> = ids
                    .into_iter()
                    .map(|id| Bson::Binary(uuid_as_binary(id)))
                    .collect();
                self.collection::<Document>(QUEUE_COLLECTION_NAME)
                    .await
                    .delete_many(doc! { "_id": { "$in": ids } })
                    .await
                    .map_err(|source| MongoDaoError::write(QUEUE_COLLECTION_NAME, source))?;
            }
            LobbyChange::ClearQueue => {
                self.collection::<Document>(QUEUE_COLLECTION_NAME)
                    .await
                    .delete_many(doc! {})
                    .await
                    .map_err(|source| MongoDaoError::write(QUEUE_COLLECTION_NAME, source))?;
            }
            LobbyChange::UpsertPreset(preset) => {
                let id = preset.id;
                let document: MongoPresetDocument = preset.into();
                self.collection::<MongoPresetDocument>(PRESET_COLLECTION_NAME)
                    .await
                    .replace_one(doc_id(id), &document)
                    .upsert(true)
                    .await
                    .map_err(|source| MongoDaoError::write(PRESET_COLLECTION_NAME, source))?;
            }
            LobbyChange::DeletePreset(id) => {
                self.collection::<Document>(PRESET_COLLECTION_NAME)
                    .await
                    .delete_one(doc_id(id))
                    .await
                    .map_err(|source| MongoDaoError::write(PRESET_COLLECTION_NAME, source))?;
            }
            LobbyChange::UpsertSession(session) => {
                let id = session.id;
                let document: MongoSessionDocument = session.into();
                self.collection::<MongoSessionDocument>(SESSION_COLLECTION_NAME)
                    .await
                    .replace_one(doc_id(id), &document)
                    .upsert(true)
                    .await
                    .map_err(|source| MongoDaoError::write(SESSION_COLLECTION_NAME, source))?;
            }
        }
        Ok(())
    }

    async fn append_registration_log(&self, entry: RegistrationLogEntity) -> MongoResult<()> {
        let counter = match entry.status {
            RegistrationStatus::Success => "successful",
            RegistrationStatus::Failed => "failed",
            RegistrationStatus::AlreadyQueued => "already_queued",
        };
        let document: MongoRegistrationLogDocument = entry.into();
        let logs = self
            .collection::<MongoRegistrationLogDocument>(LOG_COLLECTION_NAME)
            .await;
        logs.insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::write(LOG_COLLECTION_NAME, source))?;

        self.collection::<Document>(STATS_COLLECTION_NAME)
            .await
            .update_one(
                doc! { "_id": STATS_DOCUMENT_ID },
                doc! { "$inc": { counter: 1_i64 } },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::write(STATS_COLLECTION_NAME, source))?;

        self.trim_registration_logs().await
    }

    /// Drop every log older than the retention window.
    async fn trim_registration_logs(&self) -> MongoResult<()> {
        let logs = self.collection::<Document>(LOG_COLLECTION_NAME).await;
        let skip = u64::try_from(self.log_retention).unwrap_or(u64::MAX);
        let stale: Vec<Document> = logs
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .projection(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::read(LOG_COLLECTION_NAME, source))?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::read(LOG_COLLECTION_NAME, source))?;

        let ids: Vec<Bson> = stale
            .into_iter()
            .filter_map(|document| document.get("_id").cloned())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        logs.delete_many(doc! { "_id": { "$in": ids } })
            .await
            .map_err(|source| MongoDaoError::write(LOG_COLLECTION_NAME, source))?;
        Ok(())
    }

    async fn recent_registration_logs(&self, limit: usize) -> MongoResult<Vec<RegistrationLogEntity>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let documents: Vec<MongoRegistrationLogDocument> = self
            .collection::<MongoRegistrationLogDocument>(LOG_COLLECTION_NAME)
            .await
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await
            .map_err(|source| MongoDaoError::read(LOG_COLLECTION_NAME, source))?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::read(LOG_COLLECTION_NAME, source))?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn registration_stats(&self) -> MongoResult<RegistrationStatsEntity> {
        let document = self
            .collection::<Document>(STATS_COLLECTION_NAME)
            .await
            .find_one(doc! { "_id": STATS_DOCUMENT_ID })
            .await
            .map_err(|source| MongoDaoError::read(STATS_COLLECTION_NAME, source))?;

        let Some(document) = document else {
            return Ok(RegistrationStatsEntity::default());
        };
        let counter = |field: &str| -> u64 {
            document
                .get_i64(field)
                .ok()
                .or_else(|| document.get_i32(field).ok().map(i64::from))
                .and_then(|value| u64::try_from(value).ok())
                .unwrap_or_default()
        };

        Ok(RegistrationStatsEntity {
            successful: counter("successful"),
            failed: counter("failed"),
            already_queued: counter("already_queued"),
        })
    }

    async fn get_config(&self, key: String) -> MongoResult<Option<String>> {
        let document = self
            .collection::<MongoConfigDocument>(CONFIG_COLLECTION_NAME)
            .await
            .find_one(doc! { "_id": &key })
            .await
            .map_err(|source| MongoDaoError::read(CONFIG_COLLECTION_NAME, source))?;
        Ok(document.map(|document| document.value))
    }

    async fn set_config(&self, key: String, value: String) -> MongoResult<()> {
        let document = MongoConfigDocument { key, value };
        self.collection::<MongoConfigDocument>(CONFIG_COLLECTION_NAME)
            .await
            .replace_one(doc! { "_id": &document.key }, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::write(CONFIG_COLLECTION_NAME, source))?;
        Ok(())
    }
}

impl LobbyStore for MongoLobbyStore {
    fn load_snapshot(&self) -> BoxFuture<'static, StorageResult<LobbySnapshot>> {
        let store = self.clone();
        Box::pin(async move { store.load_snapshot().await.map_err(Into::into) })
    }

    fn apply(&self, changes: Vec<LobbyChange>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.apply(changes).await.map_err(Into::into) })
    }

    fn append_registration_log(
        &self,
        entry: RegistrationLogEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.append_registration_log(entry).await.map_err(Into::into) })
    }

    fn recent_registration_logs(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<RegistrationLogEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.recent_registration_logs(limit).await.map_err(Into::into) })
    }

    fn registration_stats(&self) -> BoxFuture<'static, StorageResult<RegistrationStatsEntity>> {
        let store = self.clone();
        Box::pin(async move { store.registration_stats().await.map_err(Into::into) })
    }

    fn get_config(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move { store.get_config(key).await.map_err(Into::into) })
    }

    fn set_config(&self, key: String, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.set_config(key, value).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
