use std::sync::Arc;

use assert_matches::assert_matches;
use barbcut_core::error::CoreError;
use barbcut_core::position::ReferenceImages;
use barbcut_core::scheduling::JobStatus;
use barbcut_db::batch::MAX_BATCH_WRITES;
use barbcut_db::document::object;
use barbcut_db::models::job::NewJob;
use barbcut_db::repositories::job_repo::Transition;
use barbcut_db::repositories::{JobRepo, UserRepo};
use barbcut_db::{
    run_transaction, ChunkedWriter, DbError, Direction, DocumentStore, MemoryStore, Query,
    SharedStore, Transaction, WriteBatch,
};
use chrono::{Duration, Utc};
use serde_json::json;

fn store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

#[tokio::test]
async fn set_get_update_delete() {
    let store = store();
    store.set("c", "a", object(json!({"x": 1, "y": 2}))).await.unwrap();

    let first = store.get("c", "a").await.unwrap().unwrap();
    assert_eq!(first.data["x"], json!(1));

    store.update("c", "a", object(json!({"y": 3}))).await.unwrap();
    let second = store.get("c", "a").await.unwrap().unwrap();
    assert_eq!(second.data["x"], json!(1));
    assert_eq!(second.data["y"], json!(3));
    assert!(second.version > first.version);

    store.delete("c", "a").await.unwrap();
    assert!(store.get("c", "a").await.unwrap().is_none());
}

#[tokio::test]
async fn update_missing_document_fails() {
    let store = store();
    let err = store.update("c", "nope", object(json!({"x": 1}))).await.unwrap_err();
    assert_matches!(err, DbError::NotFound { .. });
}

#[tokio::test]
async fn failed_commit_writes_nothing() {
    let store = store();
    let mut batch = WriteBatch::new();
    batch
        .set("c", "a", object(json!({"x": 1})))
        .update("c", "missing", object(json!({"x": 2})));

    assert_matches!(batch.commit(store.as_ref()).await, Err(DbError::NotFound { .. }));
    assert!(store.get("c", "a").await.unwrap().is_none());
}

#[tokio::test]
async fn set_merge_keeps_existing_fields() {
    let store = store();
    store.set("c", "a", object(json!({"x": 1}))).await.unwrap();
    store.set_merge("c", "a", object(json!({"y": 2}))).await.unwrap();
    let doc = store.get("c", "a").await.unwrap().unwrap();
    assert_eq!(doc.data, object(json!({"x": 1, "y": 2})));
}

#[tokio::test]
async fn stale_read_conflicts_on_commit() {
    let store = store();
    store.set("c", "a", object(json!({"n": 1}))).await.unwrap();

    let mut tx = Transaction::new(Arc::clone(&store));
    tx.get("c", "a").await.unwrap();
    store.update("c", "a", object(json!({"n": 2}))).await.unwrap();
    tx.update("c", "a", object(json!({"n": 10})));

    assert_matches!(tx.commit().await, Err(DbError::Conflict(_)));
    let doc = store.get("c", "a").await.unwrap().unwrap();
    assert_eq!(doc.data["n"], json!(2));
}

#[tokio::test]
async fn absent_read_conflicts_when_document_appears() {
    let store = store();
    let mut tx = Transaction::new(Arc::clone(&store));
    assert!(tx.get("c", "a").await.unwrap().is_none());
    store.set("c", "a", object(json!({}))).await.unwrap();
    tx.set("c", "a", object(json!({"mine": true})));
    assert_matches!(tx.commit().await, Err(DbError::Conflict(_)));
}

#[tokio::test]
async fn reads_after_writes_are_rejected() {
    let store = store();
    let mut tx = Transaction::new(Arc::clone(&store));
    tx.set("c", "a", object(json!({})));
    assert_matches!(tx.get("c", "a").await, Err(DbError::ReadAfterWrite));
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let store = store();
    store.set("c", "counter", object(json!({"n": 0}))).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            run_transaction(&store, |tx| {
                Box::pin(async move {
                    let doc = tx.get("c", "counter").await?.expect("counter exists");
                    let n = doc.data["n"].as_i64().unwrap_or(0);
                    tx.update("c", "counter", object(json!({"n": n + 1})));
                    Ok::<_, DbError>(())
                })
            })
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let doc = store.get("c", "counter").await.unwrap().unwrap();
    assert_eq!(doc.data["n"], json!(4));
}

#[tokio::test]
async fn batch_limit_is_enforced() {
    let store = store();
    let mut batch = WriteBatch::new();
    for i in 0..=MAX_BATCH_WRITES {
        batch.set("c", &format!("d{i}"), object(json!({})));
    }
    assert_matches!(batch.commit(store.as_ref()).await, Err(DbError::BatchTooLarge(501)));
    assert!(store.list_collection("c").await.unwrap().is_empty());
}

#[tokio::test]
async fn chunked_writer_splits_large_runs() {
    let store = store();
    let mut writer = ChunkedWriter::new(store.as_ref());
    for i in 0..1000 {
        writer.set("c", &format!("d{i:04}"), object(json!({"i": i}))).await.unwrap();
    }
    assert_eq!(writer.finish().await.unwrap(), 1000);
    assert_eq!(store.list_collection("c").await.unwrap().len(), 1000);
}

#[tokio::test]
async fn query_orders_and_limits() {
    let store = store();
    for (id, status, created) in [
        ("a", "queued", "2026-01-01T00:00:03.000000Z"),
        ("b", "queued", "2026-01-01T00:00:01.000000Z"),
        ("c", "processing", "2026-01-01T00:00:00.000000Z"),
        ("d", "queued", "2026-01-01T00:00:02.000000Z"),
    ] {
        store
            .set("jobs", id, object(json!({"status": status, "createdAt": created})))
            .await
            .unwrap();
    }

    let query = Query::collection("jobs")
        .where_eq("status", "queued")
        .order_by("createdAt", Direction::Asc)
        .limit(2);
    let ids: Vec<_> = store.query(&query).await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["b", "d"]);
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

async fn queued_job(store: &SharedStore) -> String {
    let refs = ReferenceImages {
        front: Some("users/u1/front.jpg".into()),
        ..Default::default()
    };
    let job = NewJob::queued("u1", "prompt".into(), refs, Utc::now());
    let mut tx = Transaction::new(Arc::clone(store));
    let id = JobRepo::create_in(&mut tx, &job).unwrap();
    tx.commit().await.unwrap();
    id
}

#[tokio::test]
async fn claim_is_exclusive() {
    let store = store();
    let id = queued_job(&store).await;

    let (a, b) = tokio::join!(
        JobRepo::claim(&store, &id, Utc::now()),
        JobRepo::claim(&store, &id, Utc::now())
    );
    let claimed = [a.unwrap(), b.unwrap()].into_iter().flatten().count();
    assert_eq!(claimed, 1);

    let job = JobRepo::find_by_id(&store, &id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert!(job.processing_started_at.is_some());
}

#[tokio::test]
async fn claim_skips_missing_jobs() {
    let store = store();
    assert!(JobRepo::claim(&store, "ghost", Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn terminal_jobs_cannot_move() {
    let store = store();
    let id = queued_job(&store).await;
    JobRepo::claim(&store, &id, Utc::now()).await.unwrap();
    let applied = JobRepo::complete(&store, &id, vec!["gs://b/x.png".into()], Utc::now())
        .await
        .unwrap();
    assert_eq!(applied, Transition::Applied);

    let err = JobRepo::fail(&store, &id, "late", Utc::now()).await.unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Conflict(_)));

    let job = JobRepo::find_by_id(&store, &id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.image_count, 1);
}

#[tokio::test]
async fn stale_processing_jobs_expire() {
    let store = store();
    let id = queued_job(&store).await;
    let started = Utc::now() - Duration::minutes(45);
    JobRepo::claim(&store, &id, started).await.unwrap();

    let cutoff = Utc::now() - Duration::minutes(30);
    assert_eq!(JobRepo::stale_processing(&store, cutoff).await.unwrap(), vec![id.clone()]);

    let outcome = JobRepo::expire_stale(&store, &id, cutoff, "timed out", Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome, Transition::Applied);
    let job = JobRepo::find_by_id(&store, &id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error_message.as_deref(), Some("timed out"));
}

#[tokio::test]
async fn debit_requires_sufficient_balance() {
    let store = store();
    store.set("users", "u1", object(json!({"points": 1}))).await.unwrap();

    let remaining = run_transaction(&store, |tx| {
        Box::pin(async move { UserRepo::debit_in(tx, "u1", 1, Utc::now()).await })
    })
    .await
    .unwrap();
    assert_eq!(remaining, 0);

    let err = run_transaction(&store, |tx| {
        Box::pin(async move { UserRepo::debit_in(tx, "u1", 1, Utc::now()).await })
    })
    .await
    .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::FailedPrecondition(_)));
    assert_eq!(UserRepo::points(&store, "u1").await.unwrap(), 0);
}

#[tokio::test]
async fn grant_points_requires_existing_user() {
    let store = store();
    let err = UserRepo::grant_points(&store, "u2", 5, Utc::now()).await.unwrap_err();
    assert_matches!(err, DbError::NotFound { collection, id } if collection == "users" && id == "u2");
    assert!(store.get("users", "u2").await.unwrap().is_none());

    store.set("users", "u2", object(json!({"name": "Sam"}))).await.unwrap();
    assert_eq!(UserRepo::grant_points(&store, "u2", 5, Utc::now()).await.unwrap(), 5);
    assert_eq!(UserRepo::grant_points(&store, "u2", 2, Utc::now()).await.unwrap(), 7);
    let user = store.get("users", "u2").await.unwrap().unwrap();
    assert_eq!(user.data["name"], json!("Sam"));
}
