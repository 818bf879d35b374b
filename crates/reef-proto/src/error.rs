use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("unsupported content type: {0}")]
    ContentType(String),
}

pub type ProtoResult<T> = Result<T, ProtoError>;
