use thiserror::Error;

use reef_crdt::Address;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no blob at address: {0}")]
    NotFound(Address),

    #[error("peer unavailable: {0}")]
    Unavailable(String),

    #[error("pub/sub failure: {0}")]
    PubSub(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
