use barbcut_core::error::CoreError;

use crate::batch::MAX_BATCH_WRITES;

/// Errors raised by the document store and repositories.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// An `update` targeted a document that does not exist.
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// A transaction's read set changed before commit.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A single batch exceeded the store's write limit.
    #[error("Batch of {0} writes exceeds the limit of {MAX_BATCH_WRITES}")]
    BatchTooLarge(usize),

    /// Transactions must perform all reads before buffering writes.
    #[error("Transaction reads must happen before writes")]
    ReadAfterWrite,

    /// A value could not be turned into a JSON object document.
    #[error("Document encode error: {0}")]
    Encode(String),

    /// A stored document did not match the expected model shape.
    #[error("Document decode error in {collection}/{id}: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },

    /// Domain rule violated (e.g. an invalid status transition).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Underlying PostgreSQL failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing schema migration failure.
    #[error("Schema migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}
