//! The periodic job scheduler.
//!
//! [`Scheduler`] drives a [`barbcut_pipeline::JobProcessor`] on a fixed
//! interval until cancelled. Overlapping instances are safe: claims are
//! transactional, so each job runs once.

pub mod config;
pub mod scheduler;

pub use config::{ConfigError, WorkerConfig};
pub use scheduler::Scheduler;
