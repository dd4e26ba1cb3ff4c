//! Error types raised by the realtime database adapter.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`RtdbDaoError`] failures.
pub type RtdbResult<T> = Result<T, RtdbDaoError>;

/// Failures that can occur while talking to the realtime database.
#[derive(Debug, Error)]
pub enum RtdbDaoError {
    /// Required environment variable is missing.
    #[error("missing realtime database environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed.
    #[error("failed to build realtime database client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The database answered with an unexpected status code.
    #[error("unexpected response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be decoded.
    #[error("failed to decode response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A JSON value could not be mapped onto the expected record.
    #[error("failed to deserialize value at `{path}`")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// The event stream broke while reading.
    #[error("event stream on `{path}` interrupted")]
    StreamRead {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server closed the event stream (`cancel` or `auth_revoked`).
    #[error("event stream on `{path}` closed by server: {reason}")]
    StreamClosed { path: String, reason: String },
}

impl From<RtdbDaoError> for StorageError {
    fn from(err: RtdbDaoError) -> Self {
        match err {
            RtdbDaoError::DeserializeValue { path, source } => {
                StorageError::malformed(path, source.to_string())
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
