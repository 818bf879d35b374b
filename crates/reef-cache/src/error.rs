use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("request queue is full")]
    QueueFull,

    #[error("request queue is closed")]
    Closed,

    #[error("cache storage failure: {0}")]
    Storage(String),

    #[error("cache codec failure: {0}")]
    Codec(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

pub(crate) fn storage(err: impl std::fmt::Display) -> CacheError {
    CacheError::Storage(err.to_string())
}

pub(crate) fn codec(err: impl std::fmt::Display) -> CacheError {
    CacheError::Codec(err.to_string())
}
