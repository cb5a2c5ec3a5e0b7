//! Repository for the schema-version singleton.

use barbcut_core::types::Timestamp;

use crate::document::to_document;
use crate::error::DbError;
use crate::models::collections;
use crate::models::migration_status::MigrationStatus;
use crate::SharedStore;

pub struct MigrationStatusRepo;

impl MigrationStatusRepo {
    /// Current status; version 0 when the document does not exist yet.
    pub async fn get(store: &SharedStore) -> Result<MigrationStatus, DbError> {
        match store
            .get(collections::MIGRATIONS, collections::MIGRATION_STATUS_ID)
            .await?
        {
            Some(snapshot) => snapshot.decode(),
            None => Ok(MigrationStatus::default()),
        }
    }

    /// Record `version` and the id of the migration it corresponds to.
    pub async fn set(
        store: &SharedStore,
        version: u32,
        last_migration: Option<&str>,
        now: Timestamp,
    ) -> Result<MigrationStatus, DbError> {
        let status = MigrationStatus {
            version,
            last_migration: last_migration.map(str::to_string),
            timestamp: Some(now),
        };
        store
            .set_merge(
                collections::MIGRATIONS,
                collections::MIGRATION_STATUS_ID,
                to_document(&status)?,
            )
            .await?;
        Ok(status)
    }
}
