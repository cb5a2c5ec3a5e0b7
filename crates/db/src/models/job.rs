//! Generation job documents (`aiJobs`).

use barbcut_core::position::ReferenceImages;
use barbcut_core::scheduling::JobStatus;
use barbcut_core::types::{timestamp_format, DocId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::document::Snapshot;
use crate::error::DbError;

/// Model identifier recorded on every job.
pub const GENERATION_MODEL: &str = "comfyui-img2img";

/// A job as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Filled from the document key, not stored in the body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: DocId,
    pub user_id: UserId,
    pub status: JobStatus,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub haircut_id: Option<String>,
    #[serde(default)]
    pub haircut_name: Option<String>,
    #[serde(default)]
    pub beard_id: Option<String>,
    #[serde(default)]
    pub beard_name: Option<String>,
    #[serde(default)]
    pub reference_images: ReferenceImages,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub generated_images: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(with = "timestamp_format")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp_format")]
    pub updated_at: Timestamp,
    #[serde(with = "timestamp_format")]
    pub scheduled_at: Timestamp,
    #[serde(default, with = "timestamp_format::option")]
    pub processing_started_at: Option<Timestamp>,
    #[serde(default, with = "timestamp_format::option")]
    pub completed_at: Option<Timestamp>,
}

impl Job {
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, DbError> {
        let mut job: Job = snapshot.decode()?;
        job.id = snapshot.id.clone();
        Ok(job)
    }
}

/// Body of a freshly queued job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub user_id: UserId,
    pub status: JobStatus,
    pub prompt: String,
    pub model: String,
    pub haircut_id: Option<String>,
    pub haircut_name: Option<String>,
    pub beard_id: Option<String>,
    pub beard_name: Option<String>,
    pub reference_images: ReferenceImages,
    pub image_count: u32,
    pub generated_images: Vec<String>,
    #[serde(with = "timestamp_format")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp_format")]
    pub updated_at: Timestamp,
    #[serde(with = "timestamp_format")]
    pub scheduled_at: Timestamp,
}

impl NewJob {
    /// A queued job with an empty output list, stamped at `now`.
    pub fn queued(
        user_id: &str,
        prompt: String,
        reference_images: ReferenceImages,
        now: Timestamp,
    ) -> Self {
        let reference_images = reference_images.normalized();
        Self {
            user_id: user_id.to_string(),
            status: JobStatus::Queued,
            prompt,
            model: GENERATION_MODEL.to_string(),
            haircut_id: None,
            haircut_name: None,
            beard_id: None,
            beard_name: None,
            image_count: reference_images.count() as u32,
            reference_images,
            generated_images: Vec::new(),
            created_at: now,
            updated_at: now,
            scheduled_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::document::to_document;

    #[test]
    fn new_job_counts_non_blank_references() {
        let refs = ReferenceImages {
            front: Some("users/u1/front.jpg".into()),
            left: Some("".into()),
            ..Default::default()
        };
        let job = NewJob::queued("u1", "p".into(), refs, Utc::now());
        assert_eq!(job.image_count, 1);
        assert_eq!(job.reference_images.left, None);
    }

    #[test]
    fn job_reads_back_with_document_id() {
        let now = Utc::now();
        let body = to_document(&NewJob::queued("u1", "p".into(), ReferenceImages::default(), now))
            .unwrap();
        assert_eq!(body["status"], json!("queued"));
        assert_eq!(body["generatedImages"], json!([]));

        let snapshot = Snapshot {
            collection: "aiJobs".into(),
            id: "job-1".into(),
            data: body,
            version: 1,
        };
        let job = Job::from_snapshot(&snapshot).unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.model, GENERATION_MODEL);
        assert_eq!(job.processing_started_at, None);
    }
}
