use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed mid-operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable context.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness constraint enforced by the backend rejected the write.
    #[error("storage conflict: {message}")]
    Conflict {
        /// Which constraint was hit.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a conflict error for a rejected unique write.
    pub fn conflict(message: impl Into<String>) -> Self {
        StorageError::Conflict {
            message: message.into(),
        }
    }
}
