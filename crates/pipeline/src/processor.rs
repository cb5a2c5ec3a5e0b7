//! The job processor: claim, generate per position, finalize.
//!
//! Each tick first expires jobs stuck in `processing`, then claims up to
//! `batch_size` of the oldest queued jobs and runs them one after another.
//! A claim is a transactional re-check of the job's status, so overlapping
//! ticks (in one process or many) never run the same job twice.
//!
//! Failures are isolated at two levels. A failing position is logged and
//! skipped; the job still completes with whatever the other positions
//! produced. A job-fatal failure moves that job to `error` and the tick
//! moves on to the next job.

use std::sync::Arc;

use barbcut_cloud::{fetch_reference, BlobError, SharedBlobStore};
use barbcut_comfyui::{GenerationRequest, GeneratorError, ImageGenerator, ImageInput};
use barbcut_core::position::Position;
use barbcut_core::prompt::position_prompt;
use barbcut_core::scheduling::{DEFAULT_BATCH_SIZE, DEFAULT_STALE_AFTER_MINUTES};
use barbcut_core::storage::{generated_image_path, StorageRef};
use barbcut_db::models::history::{HistoryRecord, NOT_APPLICABLE};
use barbcut_db::models::job::Job;
use barbcut_db::repositories::job_repo::Transition;
use barbcut_db::repositories::JobRepo;
use barbcut_db::{DbError, SharedStore, Snapshot};
use chrono::{Duration, Utc};
use serde::Serialize;

/// Content type of every stored output image.
const OUTPUT_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Max jobs claimed per tick.
    pub batch_size: usize,
    /// Jobs `processing` for longer than this are failed. `None` disables.
    pub stale_after: Option<Duration>,
    /// Bucket for generated images and for bare reference paths.
    pub bucket: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            stale_after: Some(Duration::minutes(DEFAULT_STALE_AFTER_MINUTES)),
            bucket: "barb-cut.appspot.com".to_string(),
        }
    }
}

/// Counters for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Stale `processing` jobs moved to `error`.
    pub reclaimed: usize,
    /// Jobs this tick moved from `queued` to `processing`.
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Candidates claimed elsewhere, gone, expired while running, or hit by
    /// a store error.
    pub skipped: usize,
}

/// Result of driving one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Not claimed by this processor.
    Skipped,
    Completed { images: usize },
    Failed { message: String },
}

/// Job-fatal failures. The rendered message becomes the job's `errorMessage`.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Image generator is not configured. Set COMFYUI_SERVER_URL to enable generation.")]
    GeneratorNotConfigured,

    #[error("Missing prompt")]
    MissingPrompt,

    #[error("No reference images found")]
    NoReferenceImages,

    #[error("Failed to generate any images")]
    NoImagesGenerated,

    #[error("Malformed job document: {0}")]
    MalformedJob(String),

    /// The job left `processing` while it was running here.
    #[error("Job is no longer processing")]
    Superseded,

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Why one position produced no image.
#[derive(Debug, thiserror::Error)]
enum PositionError {
    #[error("storage: {0}")]
    Storage(#[from] BlobError),

    #[error("generator: {0}")]
    Generator(#[from] GeneratorError),

    #[error("generator returned an empty image")]
    EmptyOutput,
}

pub struct JobProcessor {
    store: SharedStore,
    blobs: SharedBlobStore,
    generator: Option<Arc<dyn ImageGenerator>>,
    config: ProcessorConfig,
}

impl JobProcessor {
    /// `generator` is `None` when no generation backend is configured; every
    /// claimed job then fails with a configuration error.
    pub fn new(
        store: SharedStore,
        blobs: SharedBlobStore,
        generator: Option<Arc<dyn ImageGenerator>>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// One scheduler pass.
    ///
    /// Only the initial queries can fail the whole tick; everything after is
    /// isolated per job.
    pub async fn run_tick(&self) -> Result<TickReport, ProcessError> {
        let mut report = TickReport {
            reclaimed: self.reclaim_stale().await?,
            ..TickReport::default()
        };

        let candidates = JobRepo::next_queued(&self.store, self.config.batch_size).await?;
        if candidates.is_empty() {
            tracing::debug!("No queued jobs");
            return Ok(report);
        }

        for job_id in candidates {
            match self.process_job(&job_id).await {
                Ok(JobOutcome::Skipped) => report.skipped += 1,
                Ok(JobOutcome::Completed { .. }) => {
                    report.claimed += 1;
                    report.completed += 1;
                }
                Ok(JobOutcome::Failed { .. }) => {
                    report.claimed += 1;
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Job processing aborted");
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            reclaimed = report.reclaimed,
            claimed = report.claimed,
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            "Scheduler tick finished"
        );
        Ok(report)
    }

    /// Claim and run a single job.
    ///
    /// Returns `Err` only when the store fails while claiming or finalizing.
    pub async fn process_job(&self, job_id: &str) -> Result<JobOutcome, ProcessError> {
        let Some(snapshot) = JobRepo::claim(&self.store, job_id, Utc::now()).await? else {
            tracing::debug!(job_id, "Job no longer queued, skipping");
            return Ok(JobOutcome::Skipped);
        };
        tracing::info!(job_id, "Job claimed");

        match self.execute(&snapshot).await {
            Ok(images) => {
                let count = images.len();
                match JobRepo::complete(&self.store, job_id, images, Utc::now()).await? {
                    Transition::Applied => {
                        tracing::info!(job_id, images = count, "Job completed");
                        Ok(JobOutcome::Completed { images: count })
                    }
                    Transition::Skipped => {
                        tracing::warn!(job_id, "Job vanished before completion");
                        Ok(JobOutcome::Skipped)
                    }
                }
            }
            Err(ProcessError::Superseded) => {
                tracing::warn!(job_id, "Job left processing while running, abandoning it");
                Ok(JobOutcome::Skipped)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(job_id, error = %message, "Job failed");
                match JobRepo::fail(&self.store, job_id, &message, Utc::now()).await? {
                    Transition::Applied => Ok(JobOutcome::Failed { message }),
                    Transition::Skipped => Ok(JobOutcome::Skipped),
                }
            }
        }
    }

    /// Generate every position of a claimed job. Returns the stored
    /// references of the images produced.
    async fn execute(&self, snapshot: &Snapshot) -> Result<Vec<String>, ProcessError> {
        let generator = self
            .generator
            .as_deref()
            .ok_or(ProcessError::GeneratorNotConfigured)?;
        let job = Job::from_snapshot(snapshot).map_err(|e| ProcessError::MalformedJob(e.to_string()))?;

        if job.prompt.trim().is_empty() {
            return Err(ProcessError::MissingPrompt);
        }
        let positions = job.reference_images.present();
        if positions.is_empty() {
            return Err(ProcessError::NoReferenceImages);
        }

        let mut generated = Vec::with_capacity(positions.len());
        for (position, reference) in positions {
            let record = match self.generate_position(generator, &job, position, reference).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(job_id = %job.id, %position, error = %e, "Position failed");
                    continue;
                }
            };

            generated.push(record.image_url.clone());
            match JobRepo::record_output(&self.store, &job.id, &generated, &record, Utc::now()).await {
                Ok(Transition::Applied) => {
                    tracing::info!(job_id = %job.id, %position, "Generated image stored");
                }
                Ok(Transition::Skipped) => return Err(ProcessError::Superseded),
                Err(e) => {
                    generated.pop();
                    tracing::warn!(job_id = %job.id, %position, error = %e, "Failed to record output");
                }
            }
        }

        if generated.is_empty() {
            return Err(ProcessError::NoImagesGenerated);
        }
        Ok(generated)
    }

    async fn generate_position(
        &self,
        generator: &dyn ImageGenerator,
        job: &Job,
        position: Position,
        reference: &str,
    ) -> Result<HistoryRecord, PositionError> {
        let source = fetch_reference(self.blobs.as_ref(), reference, &self.config.bucket).await?;
        tracing::debug!(
            job_id = %job.id,
            %position,
            bucket = %source.location.bucket,
            path = %source.location.path,
            content_type = %source.content_type,
            bytes = source.bytes.len(),
            "Reference image downloaded"
        );

        let request = GenerationRequest {
            prompt: position_prompt(&job.prompt, position),
            reference: Some(ImageInput {
                bytes: source.bytes,
                content_type: source.content_type,
            }),
        };
        let image = generator.generate(&request).await?;
        if image.bytes.is_empty() {
            return Err(PositionError::EmptyOutput);
        }

        let location = StorageRef::new(
            self.config.bucket.as_str(),
            generated_image_path(&job.user_id, &job.id, position),
        );
        self.blobs
            .put(&location.bucket, &location.path, image.bytes, OUTPUT_CONTENT_TYPE)
            .await?;

        let now = Utc::now();
        Ok(HistoryRecord {
            user_id: job.user_id.clone(),
            image_url: location.to_gs_url(),
            haircut: job.haircut_name.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            beard: job.beard_name.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            position,
            job_id: job.id.clone(),
            generated_at: now,
            timestamp: now,
        })
    }

    /// Fail jobs stuck in `processing` past the configured threshold.
    ///
    /// Expired jobs are never re-queued.
    pub async fn reclaim_stale(&self) -> Result<usize, ProcessError> {
        let Some(stale_after) = self.config.stale_after else {
            return Ok(0);
        };

        let now = Utc::now();
        let cutoff = now - stale_after;
        let message = format!(
            "Processing timed out after {} minutes",
            stale_after.num_minutes()
        );

        let mut reclaimed = 0;
        for job_id in JobRepo::stale_processing(&self.store, cutoff).await? {
            match JobRepo::expire_stale(&self.store, &job_id, cutoff, &message, now).await {
                Ok(Transition::Applied) => {
                    tracing::warn!(job_id = %job_id, "Stale processing job moved to error");
                    reclaimed += 1;
                }
                Ok(Transition::Skipped) => {}
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to expire stale job");
                }
            }
        }
        Ok(reclaimed)
    }
}
