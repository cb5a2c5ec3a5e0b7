//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::batch::MAX_BATCH_WRITES;
use crate::document::{Document, Precondition, Query, Snapshot, Write};
use crate::error::DbError;
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
struct StoredDoc {
    data: Document,
    version: u64,
}

/// Collection name -> id-ordered documents.
type Collections = HashMap<String, BTreeMap<String, StoredDoc>>;

/// A [`DocumentStore`] held entirely in memory.
///
/// Commits take the write lock, so preconditions and writes are checked and
/// applied as one step. Versions come from a single store-wide counter.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    next_version: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, DbError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| Snapshot {
                collection: collection.to_string(),
                id: id.to_string(),
                data: doc.data.clone(),
                version: doc.version,
            }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>, DbError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let snapshots = docs.iter().map(|(id, doc)| Snapshot {
            collection: query.collection.clone(),
            id: id.clone(),
            data: doc.data.clone(),
            version: doc.version,
        });
        Ok(query.apply(snapshots))
    }

    async fn commit(
        &self,
        preconditions: Vec<Precondition>,
        writes: Vec<Write>,
    ) -> Result<(), DbError> {
        if writes.len() > MAX_BATCH_WRITES {
            return Err(DbError::BatchTooLarge(writes.len()));
        }

        let mut collections = self.collections.write().await;

        for pre in &preconditions {
            let current = collections
                .get(&pre.collection)
                .and_then(|docs| docs.get(&pre.id))
                .map(|doc| doc.version);
            if current != pre.expected_version {
                return Err(DbError::Conflict(format!(
                    "{}/{} was modified concurrently",
                    pre.collection, pre.id
                )));
            }
        }

        // Stage every touched document so a failing write leaves the store
        // untouched.
        let mut staged: HashMap<(String, String), Option<StoredDoc>> = HashMap::new();
        for write in &writes {
            let (collection, id) = write.target();
            let key = (collection.to_string(), id.to_string());
            if !staged.contains_key(&key) {
                let current = collections.get(collection).and_then(|docs| docs.get(id)).cloned();
                staged.insert(key, current);
            }
        }

        for write in writes {
            match write {
                Write::Set {
                    collection,
                    id,
                    data,
                    merge,
                } => {
                    let version = self.bump();
                    let slot = staged.entry((collection, id)).or_default();
                    let data = match (merge, slot.take()) {
                        (true, Some(mut existing)) => {
                            existing.data.extend(data);
                            existing.data
                        }
                        _ => data,
                    };
                    *slot = Some(StoredDoc { data, version });
                }
                Write::Update {
                    collection,
                    id,
                    fields,
                } => {
                    let version = self.bump();
                    let key = (collection, id);
                    match staged.get_mut(&key).and_then(Option::as_mut) {
                        Some(existing) => {
                            existing.data.extend(fields);
                            existing.version = version;
                        }
                        None => {
                            return Err(DbError::NotFound {
                                collection: key.0,
                                id: key.1,
                            });
                        }
                    }
                }
                Write::Delete { collection, id } => {
                    staged.insert((collection, id), None);
                }
            }
        }

        for ((collection, id), doc) in staged {
            match doc {
                Some(doc) => {
                    collections.entry(collection).or_default().insert(id, doc);
                }
                None => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}
