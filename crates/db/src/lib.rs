//! Document store abstraction, backends, models and repositories.
//!
//! The [`DocumentStore`] trait is the only persistence contract the rest of
//! the workspace sees. [`MemoryStore`] backs tests and local development;
//! [`PgDocumentStore`] keeps the same documents in a PostgreSQL JSONB table.

pub mod backend;
pub mod batch;
pub mod document;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;
pub mod transaction;

use std::sync::Arc;

pub use backend::memory::MemoryStore;
pub use backend::postgres::PgDocumentStore;
pub use batch::{ChunkedWriter, WriteBatch};
pub use document::{Direction, Document, FilterOp, Query, Snapshot};
pub use error::DbError;
pub use store::DocumentStore;
pub use transaction::{run_transaction, Transaction};

/// Shared handle to whichever backend the process was configured with.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Connect to the configured document store.
///
/// With a `database_url` this opens a PostgreSQL pool and applies the
/// backing schema; without one it falls back to an empty in-memory store.
pub async fn connect(database_url: Option<&str>) -> Result<SharedStore, DbError> {
    match database_url {
        Some(url) => {
            let pool = backend::postgres::create_pool(url).await?;
            backend::postgres::health_check(&pool).await?;
            backend::postgres::run_migrations(&pool).await?;
            tracing::info!("PostgreSQL document store ready");
            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
