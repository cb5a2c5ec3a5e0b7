//! Repository for generated-image history (`history`).

use barbcut_core::types::DocId;

use crate::document::{to_document, Direction, Query};
use crate::error::DbError;
use crate::models::collections;
use crate::models::history::HistoryRecord;
use crate::transaction::Transaction;
use crate::SharedStore;

pub struct HistoryRepo;

impl HistoryRepo {
    /// Buffer one record inside `tx` under a store-generated id.
    pub fn add_in(tx: &mut Transaction, record: &HistoryRecord) -> Result<DocId, DbError> {
        let id = tx.new_id();
        tx.set(collections::HISTORY, &id, to_document(record)?);
        Ok(id)
    }

    /// Records produced by one job, in generation order.
    pub async fn list_by_job(store: &SharedStore, job_id: &str) -> Result<Vec<HistoryRecord>, DbError> {
        let query = Query::collection(collections::HISTORY)
            .where_eq("jobId", job_id)
            .order_by("generatedAt", Direction::Asc);
        store
            .query(&query)
            .await?
            .iter()
            .map(|s| s.decode())
            .collect()
    }
}
