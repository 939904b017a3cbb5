use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Result alias for MongoDB store operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// MongoDB error code reported when a unique index rejects a write.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures raised by the MongoDB store before they are mapped to [`StorageError`](crate::dao::storage::StorageError).
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// URI as supplied by configuration.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the parsed client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered a ping while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings sent before giving up.
        attempts: u32,
        /// Last ping error.
        #[source]
        source: MongoError,
    },
    /// A ping on an established connection failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Index creation failed at startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A unique index rejected the write.
    #[error("unique index rejected a write to `{collection}`")]
    Duplicate {
        /// Target collection.
        collection: &'static str,
        /// Driver error carrying the duplicate key code.
        #[source]
        source: MongoError,
    },
    /// Any other write failure.
    #[error("failed to write to `{collection}`")]
    Write {
        /// Target collection.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A query or cursor failed.
    #[error("failed to read from `{collection}`")]
    Read {
        /// Source collection.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A stored document no longer matches the expected shape.
    #[error("corrupt document in `{collection}`: {reason}")]
    CorruptDocument {
        /// Source collection.
        collection: &'static str,
        /// What failed to decode.
        reason: String,
    },
}

impl MongoDaoError {
    /// Classify a failed write, separating unique-index violations from other failures.
    pub fn write(collection: &'static str, source: MongoError) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::Duplicate { collection, source }
        } else {
            MongoDaoError::Write { collection, source }
        }
    }

    /// Wrap a failed read against `collection`.
    pub fn read(collection: &'static str, source: MongoError) -> Self {
        MongoDaoError::Read { collection, source }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}
