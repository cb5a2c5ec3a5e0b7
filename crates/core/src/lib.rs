//! Domain logic shared by every barbcut crate.
//!
//! Nothing in here performs I/O: job status rules, reference-photo
//! positions, prompt construction, storage reference parsing and migration
//! id handling are all pure functions so the store, worker and CLI layers
//! can share them.

pub mod error;
pub mod migration_id;
pub mod points;
pub mod position;
pub mod prompt;
pub mod scheduling;
pub mod storage;
pub mod types;
