//! Applies and rolls back registered migrations against the status document.

use barbcut_db::repositories::MigrationStatusRepo;
use chrono::Utc;
use serde::Serialize;

use crate::error::MigrationError;
use crate::registry::MigrationRegistry;
use crate::MigrationContext;

/// Snapshot of where the store stands relative to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub current_version: u32,
    pub last_migration: Option<String>,
    pub total_migrations: usize,
    pub pending: Vec<String>,
}

pub struct MigrationRunner {
    registry: MigrationRegistry,
    ctx: MigrationContext,
}

impl MigrationRunner {
    pub fn new(registry: MigrationRegistry, ctx: MigrationContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Apply every pending migration in order. Returns the ids applied.
    ///
    /// The version is persisted after each step; the first failure aborts
    /// the run and leaves the version at the last completed step.
    pub async fn up(&self) -> Result<Vec<String>, MigrationError> {
        let status = MigrationStatusRepo::get(&self.ctx.store).await?;
        if status.version as usize > self.registry.len() {
            tracing::warn!(
                version = status.version,
                total = self.registry.len(),
                "Stored version is ahead of the registered migrations"
            );
        }

        let mut applied = Vec::new();
        for (number, migration) in self.registry.pending(status.version) {
            let id = migration.id();
            tracing::info!(migration_id = id, description = migration.description(), "Applying migration");

            migration
                .up(&self.ctx)
                .await
                .map_err(|e| MigrationError::Failed {
                    id: id.to_string(),
                    source: Box::new(e),
                })?;
            MigrationStatusRepo::set(&self.ctx.store, number, Some(id), Utc::now()).await?;

            tracing::info!(migration_id = id, version = number, "Migration applied");
            applied.push(id.to_string());
        }

        if applied.is_empty() {
            tracing::info!(version = status.version, "No pending migrations");
        }
        Ok(applied)
    }

    /// Roll back the current migration only. Returns its id, or `None` at
    /// version 0.
    pub async fn down(&self) -> Result<Option<String>, MigrationError> {
        let status = MigrationStatusRepo::get(&self.ctx.store).await?;
        if status.version == 0 {
            tracing::info!("Nothing to roll back");
            return Ok(None);
        }

        let migration = self
            .registry
            .get(status.version)
            .ok_or(MigrationError::UnknownVersion(status.version))?;
        let id = migration.id();
        tracing::info!(migration_id = id, version = status.version, "Rolling back migration");

        migration
            .down(&self.ctx)
            .await
            .map_err(|e| MigrationError::Failed {
                id: id.to_string(),
                source: Box::new(e),
            })?;

        let version = status.version - 1;
        let last = self.registry.get(version).map(|m| m.id());
        MigrationStatusRepo::set(&self.ctx.store, version, last, Utc::now()).await?;

        tracing::info!(migration_id = id, version, "Migration rolled back");
        Ok(Some(id.to_string()))
    }

    pub async fn status(&self) -> Result<StatusReport, MigrationError> {
        let status = MigrationStatusRepo::get(&self.ctx.store).await?;
        Ok(StatusReport {
            current_version: status.version,
            last_migration: status.last_migration,
            total_migrations: self.registry.len(),
            pending: self
                .registry
                .pending(status.version)
                .map(|(_, m)| m.id().to_string())
                .collect(),
        })
    }
}
