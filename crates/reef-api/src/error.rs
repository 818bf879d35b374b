use thiserror::Error;

use reef_crdt::CrdtError;
use reef_query::QueryError;

/// Error kinds surfaced by the service and engine.
///
/// `Validation` and `QueueFull` surface synchronously from `call`; every
/// other kind is delivered on the response channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("request queue is full")]
    QueueFull,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store failure: {0}")]
    Store(String),

    #[error("decode failure: {0}")]
    Decode(String),

    /// Unused by the CRDT engine (joins cannot conflict); kept for engines
    /// with non-mergeable state.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service is closed")]
    AlreadyClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation(msg) => ApiError::Validation(msg),
            QueryError::NotFound(inner) => ApiError::NotFound(inner.to_string()),
        }
    }
}

impl From<CrdtError> for ApiError {
    fn from(err: CrdtError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
