use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable context of the failed operation.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered with a payload that does not match the game record layout.
    #[error("malformed record at `{path}`: {reason}")]
    Malformed {
        /// Location of the offending record.
        path: String,
        /// What was wrong with it.
        reason: String,
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

    /// Construct an error describing a record that could not be interpreted.
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
