use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CrdtError {
    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("no such row: {0}")]
    NoSuchRow(String),

    #[error("no such entry: {0}")]
    NoSuchEntry(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

pub type CrdtResult<T> = Result<T, CrdtError>;
