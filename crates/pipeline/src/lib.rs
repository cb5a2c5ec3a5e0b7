//! The generation job lifecycle.
//!
//! [`ingestion`] turns a caller's style selection into a queued job while
//! debiting one credit; [`processor`] claims queued jobs, generates one
//! image per reference position and finalizes each job.

pub mod ingestion;
pub mod processor;

pub use ingestion::{create_job, CallerIdentity, CreateJobInput, CreateJobResponse, IngestError};
pub use processor::{JobOutcome, JobProcessor, ProcessError, ProcessorConfig, TickReport};
