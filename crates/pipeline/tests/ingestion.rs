mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use barbcut_core::position::Position;
use barbcut_core::scheduling::JobStatus;
use barbcut_db::document::object;
use barbcut_db::repositories::{JobRepo, UserRepo};
use barbcut_db::DocumentStore;
use barbcut_pipeline::{create_job, CallerIdentity, CreateJobInput, IngestError};
use common::Harness;
use serde_json::json;

async fn job_count(h: &Harness) -> usize {
    h.store.list_collection("aiJobs").await.unwrap().len()
}

#[tokio::test]
async fn balance_of_one_allows_exactly_one_job() {
    let h = Harness::new();
    h.seed_user("u1", 1).await;
    h.seed_photos("u1", &[Position::Front]).await;
    let caller = CallerIdentity::new("u1");

    let created = create_job(&h.store, Some(&caller), &CreateJobInput::default())
        .await
        .unwrap();
    assert!(created.success);
    assert_eq!(created.status, JobStatus::Queued);
    assert_eq!(created.image_count, 1);
    assert_eq!(UserRepo::points(&h.store, "u1").await.unwrap(), 0);

    let job = JobRepo::find_by_id(&h.store, &created.job_id).await.unwrap().unwrap();
    assert_eq!(job.user_id, "u1");
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.generated_images.is_empty());
    assert_eq!(job.image_count, 1);
    assert!(job.prompt.contains("a fresh, well-groomed look"));

    let err = create_job(&h.store, Some(&caller), &CreateJobInput::default())
        .await
        .unwrap_err();
    assert_matches!(err, IngestError::FailedPrecondition(msg) if msg.contains("Insufficient points"));
    assert_eq!(job_count(&h).await, 1);
    assert_eq!(UserRepo::points(&h.store, "u1").await.unwrap(), 0);
}

#[tokio::test]
async fn image_count_matches_present_positions() {
    let h = Harness::new();
    h.seed_user("u1", 5).await;
    h.seed_photos("u1", &[Position::Front, Position::Right, Position::Back]).await;

    let created = create_job(&h.store, Some(&CallerIdentity::new("u1")), &CreateJobInput::default())
        .await
        .unwrap();
    assert_eq!(created.image_count, 3);
    assert_eq!(UserRepo::points(&h.store, "u1").await.unwrap(), 4);
}

#[tokio::test]
async fn no_photos_fails_without_charging() {
    let h = Harness::new();
    h.seed_user("u1", 3).await;
    h.store
        .set("userPhotos", "u1", object(json!({"front": "", "left": null})))
        .await
        .unwrap();

    let err = create_job(&h.store, Some(&CallerIdentity::new("u1")), &CreateJobInput::default())
        .await
        .unwrap_err();
    assert_matches!(err, IngestError::FailedPrecondition(msg) if msg.contains("upload at least one photo"));
    assert_eq!(UserRepo::points(&h.store, "u1").await.unwrap(), 3);
    assert_eq!(job_count(&h).await, 0);
}

#[tokio::test]
async fn insufficient_balance_creates_nothing() {
    let h = Harness::new();
    h.seed_photos("u1", &[Position::Front]).await;

    let err = create_job(&h.store, Some(&CallerIdentity::new("u1")), &CreateJobInput::default())
        .await
        .unwrap_err();
    assert_matches!(err, IngestError::FailedPrecondition(_));
    assert_eq!(job_count(&h).await, 0);
    assert!(h.store.get("users", "u1").await.unwrap().is_none());
}

#[tokio::test]
async fn anonymous_callers_are_rejected() {
    let h = Harness::new();
    let err = create_job(&h.store, None, &CreateJobInput::default()).await.unwrap_err();
    assert_matches!(err, IngestError::Unauthenticated(_));
}

#[tokio::test]
async fn oversized_ids_are_invalid() {
    let h = Harness::new();
    let input = CreateJobInput {
        haircut_id: Some("h".repeat(200)),
        beard_id: None,
    };
    let err = create_job(&h.store, Some(&CallerIdentity::new("u1")), &input)
        .await
        .unwrap_err();
    assert_matches!(err, IngestError::InvalidArgument(_));
}

#[tokio::test]
async fn styles_feed_the_prompt_and_names() {
    let h = Harness::new();
    h.seed_user("u1", 2).await;
    h.seed_photos("u1", &[Position::Left]).await;
    h.store
        .set(
            "haircuts",
            "h1",
            object(json!({"name": "Skin Fade", "description": "short on the sides"})),
        )
        .await
        .unwrap();

    let input = CreateJobInput {
        haircut_id: Some("h1".into()),
        beard_id: Some("missing-beard".into()),
    };
    let created = create_job(&h.store, Some(&CallerIdentity::new("u1")), &input)
        .await
        .unwrap();

    let job = JobRepo::find_by_id(&h.store, &created.job_id).await.unwrap().unwrap();
    assert_eq!(job.haircut_id.as_deref(), Some("h1"));
    assert_eq!(job.haircut_name.as_deref(), Some("Skin Fade"));
    assert_eq!(job.beard_id.as_deref(), Some("missing-beard"));
    assert_eq!(job.beard_name, None);
    assert!(job.prompt.contains("haircut: Skin Fade, short on the sides"));
    assert!(!job.prompt.contains("beard:"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_overdraw() {
    let h = Harness::new();
    h.seed_user("u1", 2).await;
    h.seed_photos("u1", &[Position::Front]).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = Arc::clone(&h.store);
        handles.push(tokio::spawn(async move {
            create_job(&store, Some(&CallerIdentity::new("u1")), &CreateJobInput::default()).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(IngestError::FailedPrecondition(_)) => {}
            // Heavy contention may exhaust the retry budget.
            Err(IngestError::Store(barbcut_db::DbError::Conflict(_))) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let points = UserRepo::points(&h.store, "u1").await.unwrap();
    assert!(succeeded <= 2);
    assert_eq!(points, 2 - succeeded as i64);
    assert_eq!(job_count(&h).await, succeeded);
}
