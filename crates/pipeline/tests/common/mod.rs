#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use barbcut_cloud::{BlobStore, MemoryBlobStore, SharedBlobStore};
use barbcut_comfyui::{GeneratedImage, GenerationRequest, GeneratorError, ImageGenerator};
use barbcut_core::position::{Position, ReferenceImages};
use barbcut_db::document::{object, to_document};
use barbcut_db::models::job::NewJob;
use barbcut_db::{DocumentStore, MemoryStore, SharedStore};
use barbcut_pipeline::{JobProcessor, ProcessorConfig};
use chrono::Utc;
use serde_json::json;

pub const BUCKET: &str = "test-bucket";

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

pub struct Harness {
    pub store: SharedStore,
    pub blobs: Arc<MemoryBlobStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }

    pub fn shared_blobs(&self) -> SharedBlobStore {
        self.blobs.clone()
    }

    pub async fn seed_user(&self, user_id: &str, points: i64) {
        self.store
            .set("users", user_id, object(json!({ "points": points })))
            .await
            .unwrap();
    }

    /// Upload reference photos for `positions` and record them on the user.
    pub async fn seed_photos(&self, user_id: &str, positions: &[Position]) {
        let mut doc = serde_json::Map::new();
        for position in positions {
            let path = format!("users/{user_id}/{position}.jpg");
            self.blobs
                .put(BUCKET, &path, PNG_BYTES.to_vec(), "image/jpeg")
                .await
                .unwrap();
            doc.insert(position.as_str().to_string(), json!(format!("gs://{BUCKET}/{path}")));
        }
        self.store.set("userPhotos", user_id, doc).await.unwrap();
    }

    /// Insert a queued job directly, bypassing ingestion.
    pub async fn insert_job(&self, user_id: &str, prompt: &str, refs: ReferenceImages) -> String {
        let job = NewJob::queued(user_id, prompt.to_string(), refs, Utc::now());
        self.store.add("aiJobs", to_document(&job).unwrap()).await.unwrap()
    }

    pub fn processor(&self, generator: Option<Arc<dyn ImageGenerator>>) -> JobProcessor {
        JobProcessor::new(
            self.store.clone(),
            self.shared_blobs(),
            generator,
            ProcessorConfig {
                bucket: BUCKET.to_string(),
                ..ProcessorConfig::default()
            },
        )
    }
}

pub fn refs(user_id: &str, positions: &[Position]) -> ReferenceImages {
    let mut refs = ReferenceImages::default();
    for position in positions {
        let value = Some(format!("gs://{BUCKET}/users/{user_id}/{position}.jpg"));
        match position {
            Position::Front => refs.front = value,
            Position::Left => refs.left = value,
            Position::Right => refs.right = value,
            Position::Back => refs.back = value,
        }
    }
    refs
}

/// Fake generator that fails for chosen positions and records every call.
pub struct ScriptedGenerator {
    failing: Vec<Position>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    delay: Option<std::time::Duration>,
}

impl ScriptedGenerator {
    pub fn succeeding() -> Arc<Self> {
        Self::failing_on(&[])
    }

    pub fn failing_on(positions: &[Position]) -> Arc<Self> {
        Arc::new(Self {
            failing: positions.to_vec(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub fn slow(delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            failing: Vec::new(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        assert!(request.reference.is_some(), "reference image must be supplied");
        let failing = self
            .failing
            .iter()
            .any(|p| request.prompt.contains(&format!("the {p} view")));
        if failing {
            return Err(GeneratorError::NoOutput);
        }
        Ok(GeneratedImage {
            bytes: PNG_BYTES.to_vec(),
            content_type: "image/png".to_string(),
        })
    }
}
