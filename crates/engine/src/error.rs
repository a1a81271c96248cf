use thiserror::Error;
use xformstack_core::CoreError;
use xformstack_storage::StorageError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("transform stack modification failed: {0}")]
    StructuralFailure(String),

    #[error("value rejected: {0}")]
    ValueRejected(String),

    #[error("entity not found: {0}")]
    EntityNotFound(String),
}
