//! Repository for generation jobs (`aiJobs`).
//!
//! Every status change re-reads the job inside a transaction and checks the
//! move against `scheduling::state_machine`, so concurrent scheduler ticks
//! can never both claim, or both finalize, the same job.

use barbcut_core::scheduling::{state_machine, JobStatus};
use barbcut_core::types::{timestamp_format, DocId, Timestamp};
use serde_json::json;

use crate::document::{object, to_document, Direction, Query, Snapshot};
use crate::error::DbError;
use crate::models::collections;
use crate::models::history::HistoryRecord;
use crate::models::job::{Job, NewJob};
use crate::repositories::HistoryRepo;
use crate::transaction::{run_transaction, Transaction};
use crate::SharedStore;

/// Outcome of a guarded status change.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The change was written.
    Applied,
    /// The job is gone or no longer in the expected state; nothing written.
    Skipped,
}

/// Provides lifecycle operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Buffer a new queued job inside `tx`. Returns the generated id.
    pub fn create_in(tx: &mut Transaction, job: &NewJob) -> Result<DocId, DbError> {
        let id = tx.new_id();
        tx.set(collections::JOBS, &id, to_document(job)?);
        Ok(id)
    }

    pub async fn find_by_id(store: &SharedStore, id: &str) -> Result<Option<Job>, DbError> {
        store
            .get(collections::JOBS, id)
            .await?
            .map(|s| Job::from_snapshot(&s))
            .transpose()
    }

    /// Ids of up to `limit` queued jobs, oldest `createdAt` first.
    pub async fn next_queued(store: &SharedStore, limit: usize) -> Result<Vec<DocId>, DbError> {
        let query = Query::collection(collections::JOBS)
            .where_eq("status", JobStatus::Queued.as_str())
            .order_by("createdAt", Direction::Asc)
            .limit(limit);
        Ok(store.query(&query).await?.into_iter().map(|s| s.id).collect())
    }

    /// Ids of jobs that entered `processing` before `cutoff`.
    pub async fn stale_processing(
        store: &SharedStore,
        cutoff: Timestamp,
    ) -> Result<Vec<DocId>, DbError> {
        let query = Query::collection(collections::JOBS)
            .where_eq("status", JobStatus::Processing.as_str())
            .filter(
                "processingStartedAt",
                crate::document::FilterOp::Lt,
                timestamp_format::format(&cutoff),
            )
            .order_by("processingStartedAt", Direction::Asc);
        Ok(store.query(&query).await?.into_iter().map(|s| s.id).collect())
    }

    /// Move a job from `queued` to `processing`.
    ///
    /// Returns the claimed document, or `None` when the job no longer exists
    /// or was already claimed elsewhere.
    pub async fn claim(
        store: &SharedStore,
        id: &str,
        now: Timestamp,
    ) -> Result<Option<Snapshot>, DbError> {
        let id = id.to_string();
        run_transaction(store, move |tx| {
            let id = id.clone();
            Box::pin(async move {
                let Some(mut snapshot) = tx.get(collections::JOBS, &id).await? else {
                    return Ok(None);
                };
                if status_of(&snapshot) != Some(JobStatus::Queued) {
                    return Ok(None);
                }
                state_machine::validate_transition(JobStatus::Queued, JobStatus::Processing)?;

                let stamp = timestamp_format::format(&now);
                let fields = object(json!({
                    "status": JobStatus::Processing.as_str(),
                    "processingStartedAt": stamp,
                    "updatedAt": stamp,
                }));
                snapshot.data.extend(fields.clone());
                tx.update(collections::JOBS, &id, fields);
                Ok(Some(snapshot))
            })
        })
        .await
    }

    /// Persist one produced image while the job is still `processing`.
    ///
    /// The output list and the history record are written together. A job
    /// that has left `processing` (expired, or gone) is left untouched and
    /// `Skipped` is returned.
    pub async fn record_output(
        store: &SharedStore,
        id: &str,
        generated_images: &[String],
        record: &HistoryRecord,
        now: Timestamp,
    ) -> Result<Transition, DbError> {
        let id = id.to_string();
        let fields = object(json!({
            "generatedImages": generated_images,
            "updatedAt": timestamp_format::format(&now),
        }));
        let record = record.clone();
        run_transaction(store, move |tx| {
            let id = id.clone();
            let fields = fields.clone();
            let record = record.clone();
            Box::pin(async move {
                let Some(snapshot) = tx.get(collections::JOBS, &id).await? else {
                    return Ok(Transition::Skipped);
                };
                if status_of(&snapshot) != Some(JobStatus::Processing) {
                    return Ok(Transition::Skipped);
                }
                tx.update(collections::JOBS, &id, fields);
                HistoryRepo::add_in(tx, &record)?;
                Ok(Transition::Applied)
            })
        })
        .await
    }

    /// Finalize a running job as `completed` with its output list.
    pub async fn complete(
        store: &SharedStore,
        id: &str,
        generated_images: Vec<String>,
        now: Timestamp,
    ) -> Result<Transition, DbError> {
        let stamp = timestamp_format::format(&now);
        let fields = object(json!({
            "status": JobStatus::Completed.as_str(),
            "imageCount": generated_images.len(),
            "generatedImages": generated_images,
            "completedAt": stamp,
            "updatedAt": stamp,
        }));
        Self::transition(store, id, JobStatus::Completed, fields).await
    }

    /// Move a job to `error` with a caller-readable message.
    pub async fn fail(
        store: &SharedStore,
        id: &str,
        message: &str,
        now: Timestamp,
    ) -> Result<Transition, DbError> {
        let fields = object(json!({
            "status": JobStatus::Error.as_str(),
            "errorMessage": message,
            "updatedAt": timestamp_format::format(&now),
        }));
        Self::transition(store, id, JobStatus::Error, fields).await
    }

    /// Fail a job still `processing` since before `cutoff`.
    ///
    /// Re-checked inside the transaction so a job that completes in the
    /// meantime is left alone.
    pub async fn expire_stale(
        store: &SharedStore,
        id: &str,
        cutoff: Timestamp,
        message: &str,
        now: Timestamp,
    ) -> Result<Transition, DbError> {
        let id = id.to_string();
        let message = message.to_string();
        run_transaction(store, move |tx| {
            let id = id.clone();
            let message = message.clone();
            Box::pin(async move {
                let Some(snapshot) = tx.get(collections::JOBS, &id).await? else {
                    return Ok(Transition::Skipped);
                };
                let started = snapshot
                    .field("processingStartedAt")
                    .and_then(|v| v.as_str())
                    .and_then(timestamp_format::parse);
                let is_stale = status_of(&snapshot) == Some(JobStatus::Processing)
                    && started.is_some_and(|s| s < cutoff);
                if !is_stale {
                    return Ok(Transition::Skipped);
                }

                tx.update(
                    collections::JOBS,
                    &id,
                    object(json!({
                        "status": JobStatus::Error.as_str(),
                        "errorMessage": message,
                        "updatedAt": timestamp_format::format(&now),
                    })),
                );
                Ok(Transition::Applied)
            })
        })
        .await
    }

    async fn transition(
        store: &SharedStore,
        id: &str,
        to: JobStatus,
        fields: crate::document::Document,
    ) -> Result<Transition, DbError> {
        let id = id.to_string();
        run_transaction(store, move |tx| {
            let id = id.clone();
            let fields = fields.clone();
            Box::pin(async move {
                let Some(snapshot) = tx.get(collections::JOBS, &id).await? else {
                    return Ok(Transition::Skipped);
                };
                let Some(from) = status_of(&snapshot) else {
                    return Err(DbError::Decode {
                        collection: collections::JOBS.to_string(),
                        id,
                        message: "missing or unknown status".to_string(),
                    });
                };
                state_machine::validate_transition(from, to)?;
                tx.update(collections::JOBS, &id, fields);
                Ok(Transition::Applied)
            })
        })
        .await
    }
}

/// Status of a raw job document, if it carries a recognized one.
pub fn status_of(snapshot: &Snapshot) -> Option<JobStatus> {
    snapshot
        .field("status")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}
