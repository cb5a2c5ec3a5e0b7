//! Optimistic read-then-write transactions.
//!
//! A [`Transaction`] records the version of every document it reads and
//! buffers its writes. On commit the recorded versions become preconditions,
//! so a concurrent change to anything read turns into
//! [`DbError::Conflict`] and [`run_transaction`] retries the whole closure
//! against fresh data.

use std::collections::HashMap;
use std::sync::Arc;

use barbcut_core::types::DocId;
use futures::future::BoxFuture;

use crate::document::{Document, Precondition, Snapshot, Write};
use crate::error::DbError;
use crate::store::DocumentStore;

/// Attempts made by [`run_transaction`] before giving up on conflicts.
pub const MAX_TRANSACTION_ATTEMPTS: usize = 5;

pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    reads: HashMap<(String, DocId), Option<u64>>,
    writes: Vec<Write>,
}

impl Transaction {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            writes: Vec::new(),
        }
    }

    /// Read a document and pin its version for the commit.
    pub async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Snapshot>, DbError> {
        if !self.writes.is_empty() {
            return Err(DbError::ReadAfterWrite);
        }

        let snapshot = self.store.get(collection, id).await?;
        let version = snapshot.as_ref().map(|s| s.version);
        let key = (collection.to_string(), id.to_string());

        match self.reads.get(&key) {
            Some(pinned) if *pinned != version => {
                return Err(DbError::Conflict(format!(
                    "{collection}/{id} changed between reads"
                )));
            }
            Some(_) => {}
            None => {
                self.reads.insert(key, version);
            }
        }
        Ok(snapshot)
    }

    /// Id for a document created inside this transaction.
    pub fn new_id(&self) -> DocId {
        self.store.new_id()
    }

    pub fn set(&mut self, collection: &str, id: &str, data: Document) {
        self.writes.push(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge: false,
        });
    }

    pub fn set_merge(&mut self, collection: &str, id: &str, data: Document) {
        self.writes.push(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge: true,
        });
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Document) {
        self.writes.push(Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn delete(&mut self, collection: &str, id: &str) {
        self.writes.push(Write::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }

    /// Submit the read versions as preconditions together with all writes.
    pub async fn commit(self) -> Result<(), DbError> {
        let preconditions = self
            .reads
            .into_iter()
            .map(|((collection, id), expected_version)| Precondition {
                collection,
                id,
                expected_version,
            })
            .collect();
        self.store.commit(preconditions, self.writes).await
    }
}

/// Run `f` inside a transaction, retrying on commit conflicts.
///
/// Errors returned by `f` abort the attempt without writing anything. Only
/// [`DbError::Conflict`] from the commit itself triggers a retry, up to
/// [`MAX_TRANSACTION_ATTEMPTS`] attempts.
///
/// ```ignore
/// let balance = run_transaction(&store, |tx| {
///     let uid = uid.clone();
///     Box::pin(async move {
///         let user = tx.get("users", &uid).await?;
///         Ok::<_, DbError>(user.is_some())
///     })
/// })
/// .await?;
/// ```
pub async fn run_transaction<T, E, F>(store: &Arc<dyn DocumentStore>, mut f: F) -> Result<T, E>
where
    F: for<'t> FnMut(&'t mut Transaction) -> BoxFuture<'t, Result<T, E>>,
    E: From<DbError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut tx = Transaction::new(Arc::clone(store));
        let value = f(&mut tx).await?;

        match tx.commit().await {
            Ok(()) => return Ok(value),
            Err(DbError::Conflict(reason)) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                tracing::debug!(attempt, reason = %reason, "Transaction conflict, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
