//! The document store contract.

use async_trait::async_trait;
use barbcut_core::types::DocId;

use crate::document::{Document, Precondition, Query, Snapshot, Write};
use crate::error::DbError;

/// Transactional document database over named collections.
///
/// Backends implement the four required methods; the single-write helpers
/// are expressed as unconditional commits. Nested collections are plain
/// collection names such as `users/{uid}/favourites`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, DbError>;

    /// Run an ordered range query.
    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>, DbError>;

    /// Atomically verify `preconditions` and apply `writes` in order.
    ///
    /// Fails with [`DbError::Conflict`] if any precondition no longer holds,
    /// in which case nothing is written.
    async fn commit(&self, preconditions: Vec<Precondition>, writes: Vec<Write>)
        -> Result<(), DbError>;

    /// Generate a fresh document id.
    fn new_id(&self) -> DocId {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Every document in `collection`, in id order.
    async fn list_collection(&self, collection: &str) -> Result<Vec<Snapshot>, DbError> {
        self.query(&Query::collection(collection)).await
    }

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), DbError> {
        self.commit(
            Vec::new(),
            vec![Write::Set {
                collection: collection.to_string(),
                id: id.to_string(),
                data,
                merge: false,
            }],
        )
        .await
    }

    /// Merge top-level fields, creating the document if needed.
    async fn set_merge(&self, collection: &str, id: &str, data: Document) -> Result<(), DbError> {
        self.commit(
            Vec::new(),
            vec![Write::Set {
                collection: collection.to_string(),
                id: id.to_string(),
                data,
                merge: true,
            }],
        )
        .await
    }

    /// Merge top-level fields into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), DbError> {
        self.commit(
            Vec::new(),
            vec![Write::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
            }],
        )
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DbError> {
        self.commit(
            Vec::new(),
            vec![Write::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            }],
        )
        .await
    }

    /// Insert a document under a store-generated id.
    async fn add(&self, collection: &str, data: Document) -> Result<DocId, DbError> {
        let id = self.new_id();
        self.set(collection, &id, data).await?;
        Ok(id)
    }
}
