use std::path::PathBuf;

use barbcut_cloud::BlobError;
use barbcut_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The registered list is malformed, duplicated or not numbered 1..n.
    #[error("Invalid migration registry: {0}")]
    InvalidRegistry(String),

    /// The stored version has no registered migration to roll back.
    #[error("No registered migration for version {0}")]
    UnknownVersion(u32),

    /// A migration step failed; earlier steps stay applied.
    #[error("Migration {id} failed: {source}")]
    Failed {
        id: String,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("Invalid data file {}: {message}", path.display())]
    InvalidData { path: PathBuf, message: String },

    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
