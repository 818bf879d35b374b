use thiserror::Error;

use reef_crdt::CrdtError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    Validation(String),

    #[error(transparent)]
    NotFound(#[from] CrdtError),
}

pub type QueryResult<T> = Result<T, QueryError>;
