//! Storage-layer errors.
//!
//! Anything the query executor or the row projection can fail with ends up
//! here. Not-found is not an error: by-id operations return `Option`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The statement failed in the database (connectivity, constraint, syntax).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A normalized row did not match the shape of the target model.
    #[error("failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
}
