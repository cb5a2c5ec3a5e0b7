//! Versioned data migrations over the document and blob stores.
//!
//! Migrations are numbered `001`, `002`, ... and applied in order. The
//! number of the last applied migration lives in the
//! `_migrations/migration_status` document, which is updated after every
//! successful step so an interrupted `up` resumes where it stopped.

pub mod error;
pub mod migrations;
pub mod registry;
pub mod runner;

use std::path::PathBuf;

use async_trait::async_trait;
use barbcut_cloud::SharedBlobStore;
use barbcut_db::SharedStore;

pub use error::MigrationError;
pub use registry::MigrationRegistry;
pub use runner::{MigrationRunner, StatusReport};

/// Everything a migration may touch.
#[derive(Clone)]
pub struct MigrationContext {
    pub store: SharedStore,
    pub blobs: SharedBlobStore,
    /// Bucket that seeded assets are uploaded to.
    pub bucket: String,
    /// Directory holding the bundled style catalogue (`data.json` + images).
    pub data_dir: PathBuf,
}

/// One reversible data migration.
///
/// Both directions must be idempotent: re-running `up` after a partial
/// failure has to skip work that already landed.
#[async_trait]
pub trait Migration: Send + Sync {
    /// `NNN_snake_case_description`.
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn up(&self, ctx: &MigrationContext) -> Result<(), MigrationError>;

    async fn down(&self, ctx: &MigrationContext) -> Result<(), MigrationError>;
}
