use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported rotation encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("unknown transform op: {0}")]
    UnknownOp(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
