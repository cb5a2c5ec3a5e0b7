//! Unconditional grouped writes.

use crate::document::{Document, Write};
use crate::error::DbError;
use crate::store::DocumentStore;

/// Hard limit on writes per commit.
pub const MAX_BATCH_WRITES: usize = 500;

/// Chunk size used for bulk rewrites, kept under [`MAX_BATCH_WRITES`].
pub const BULK_CHUNK_SIZE: usize = 450;

/// A group of writes committed together without preconditions.
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: &str, id: &str, data: Document) -> &mut Self {
        self.writes.push(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge: false,
        });
        self
    }

    pub fn set_merge(&mut self, collection: &str, id: &str, data: Document) -> &mut Self {
        self.writes.push(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge: true,
        });
        self
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Document) -> &mut Self {
        self.writes.push(Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.writes.push(Write::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Commit every buffered write atomically.
    pub async fn commit(self, store: &dyn DocumentStore) -> Result<usize, DbError> {
        let count = self.writes.len();
        if count > MAX_BATCH_WRITES {
            return Err(DbError::BatchTooLarge(count));
        }
        if count == 0 {
            return Ok(0);
        }
        store.commit(Vec::new(), self.writes).await?;
        Ok(count)
    }
}

/// Batch writer that commits every `chunk_size` writes.
///
/// Used for bulk document rewrites that may touch more documents than one
/// batch allows. Each chunk is atomic on its own; the whole run is not.
pub struct ChunkedWriter<'a> {
    store: &'a dyn DocumentStore,
    batch: WriteBatch,
    chunk_size: usize,
    committed: usize,
}

impl<'a> ChunkedWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self::with_chunk_size(store, BULK_CHUNK_SIZE)
    }

    pub fn with_chunk_size(store: &'a dyn DocumentStore, chunk_size: usize) -> Self {
        Self {
            store,
            batch: WriteBatch::new(),
            chunk_size: chunk_size.clamp(1, MAX_BATCH_WRITES),
            committed: 0,
        }
    }

    pub async fn set(&mut self, collection: &str, id: &str, data: Document) -> Result<(), DbError> {
        self.batch.set(collection, id, data);
        self.flush_if_full().await
    }

    pub async fn update(&mut self, collection: &str, id: &str, fields: Document) -> Result<(), DbError> {
        self.batch.update(collection, id, fields);
        self.flush_if_full().await
    }

    pub async fn delete(&mut self, collection: &str, id: &str) -> Result<(), DbError> {
        self.batch.delete(collection, id);
        self.flush_if_full().await
    }

    async fn flush_if_full(&mut self) -> Result<(), DbError> {
        if self.batch.len() >= self.chunk_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Commit whatever is buffered.
    pub async fn flush(&mut self) -> Result<(), DbError> {
        let batch = std::mem::take(&mut self.batch);
        let count = batch.commit(self.store).await?;
        if count > 0 {
            tracing::debug!(count, "Committed write chunk");
        }
        self.committed += count;
        Ok(())
    }

    /// Flush the tail and return the total number of writes committed.
    pub async fn finish(mut self) -> Result<usize, DbError> {
        self.flush().await?;
        Ok(self.committed)
    }
}
