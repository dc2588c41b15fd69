//! Typed error type for the queue crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("db error: {0}")]
    Db(#[from] db::DbError),

    #[error("job {0} not found")]
    NotFound(uuid::Uuid),

    #[error("failed to serialize job payload: {0}")]
    Serialization(String),
}
