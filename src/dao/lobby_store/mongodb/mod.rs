mod config;
mod connection;
mod error;
mod models;
/// Store implementation over the collections.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoLobbyStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Duplicate { collection, .. } => {
                StorageError::conflict(format!("duplicate key in `{collection}`"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
