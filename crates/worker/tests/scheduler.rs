use std::sync::Arc;
use std::time::Duration;

use barbcut_cloud::MemoryBlobStore;
use barbcut_core::scheduling::JobStatus;
use barbcut_db::document::object;
use barbcut_db::repositories::JobRepo;
use barbcut_db::{DocumentStore, MemoryStore, SharedStore};
use barbcut_pipeline::JobProcessor;
use barbcut_worker::{Scheduler, WorkerConfig};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn scheduler_ticks_until_cancelled() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    store
        .set(
            "aiJobs",
            "job1",
            object(json!({
                "userId": "u1",
                "status": "queued",
                "prompt": "A portrait.",
                "referenceImages": { "front": "users/u1/front.jpg" },
                "createdAt": "2026-01-01T00:00:00.000000Z",
                "updatedAt": "2026-01-01T00:00:00.000000Z",
                "scheduledAt": "2026-01-01T00:00:00.000000Z"
            })),
        )
        .await
        .unwrap();

    let config = WorkerConfig {
        tick_interval: Duration::from_millis(20),
        ..WorkerConfig::default()
    };
    // No generator configured: the claimed job is failed on the first tick.
    let processor = JobProcessor::new(
        store.clone(),
        Arc::new(MemoryBlobStore::new()),
        None,
        config.processor_config("test-bucket"),
    );
    let scheduler = Scheduler::new(processor, config.tick_interval);

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    let mut status = JobStatus::Queued;
    for _ in 0..100 {
        status = JobRepo::find_by_id(&store, "job1").await.unwrap().unwrap().status;
        if status != JobStatus::Queued {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, JobStatus::Error);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler stops after cancellation")
        .unwrap();
}
