use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("type mismatch on {attr}: declared {declared}, got {actual}")]
    TypeMismatch {
        attr: String,
        declared: String,
        actual: String,
    },

    #[error("entity collision: {path}")]
    EntityCollision { path: String },

    #[error("core error: {0}")]
    Core(#[from] xformstack_core::CoreError),
}
