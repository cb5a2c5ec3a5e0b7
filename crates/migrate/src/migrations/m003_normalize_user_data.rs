//! Fill missing canonical fields on user documents and backfill
//! `favouritesCount` from the favourites subcollection.

use async_trait::async_trait;
use barbcut_core::points::DEFAULT_FREE_CREDITS;
use barbcut_core::types::timestamp_format;
use barbcut_db::models::collections;
use barbcut_db::models::user::{defaults, POINTS_FIELD};
use barbcut_db::{ChunkedWriter, Document};
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::MigrationError;
use crate::{Migration, MigrationContext};

const FAVOURITES_COUNT_FIELD: &str = "favouritesCount";
const UPDATED_AT_FIELD: &str = "updatedAt";

fn canonical_defaults() -> [(&'static str, Value); 4] {
    [
        ("role", json!(defaults::ROLE)),
        ("isActive", json!(defaults::IS_ACTIVE)),
        (FAVOURITES_COUNT_FIELD, json!(defaults::FAVOURITES_COUNT)),
        (POINTS_FIELD, json!(DEFAULT_FREE_CREDITS)),
    ]
}

pub struct NormalizeUserData;

#[async_trait]
impl Migration for NormalizeUserData {
    fn id(&self) -> &'static str {
        "003_normalize_user_data"
    }

    fn description(&self) -> &'static str {
        "Merge missing canonical user fields and backfill favouritesCount"
    }

    async fn up(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        let users = ctx.store.list_collection(collections::USERS).await?;
        let stamp = timestamp_format::format(&Utc::now());

        let mut writer = ChunkedWriter::new(ctx.store.as_ref());
        for user in &users {
            let updates = missing_defaults(&user.data, &stamp);
            if !updates.is_empty() {
                writer.update(collections::USERS, &user.id, updates).await?;
            }
        }
        let updated = writer.finish().await?;
        tracing::info!(updated, "User documents given missing canonical fields");

        // Second pass reads the subcollections after the defaults landed.
        let mut backfilled = 0usize;
        for user in &users {
            let current = user
                .field(FAVOURITES_COUNT_FIELD)
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let actual = ctx
                .store
                .list_collection(&collections::favourites(&user.id))
                .await?
                .len() as i64;
            if actual != current {
                let mut fields = Document::new();
                fields.insert(FAVOURITES_COUNT_FIELD.to_string(), json!(actual));
                fields.insert(UPDATED_AT_FIELD.to_string(), json!(stamp));
                ctx.store.update(collections::USERS, &user.id, fields).await?;
                backfilled += 1;
            }
        }
        if backfilled > 0 {
            tracing::info!(backfilled, "Backfilled favouritesCount");
        }
        Ok(())
    }

    async fn down(&self, _ctx: &MigrationContext) -> Result<(), MigrationError> {
        tracing::info!("No rollback for 003_normalize_user_data");
        Ok(())
    }
}

/// Defaults for fields that are absent or null.
fn missing_defaults(data: &Document, stamp: &str) -> Document {
    let is_missing = |key: &str| matches!(data.get(key), None | Some(Value::Null));

    let mut updates = Document::new();
    for (key, value) in canonical_defaults() {
        if is_missing(key) {
            updates.insert(key.to_string(), value);
        }
    }
    if is_missing(UPDATED_AT_FIELD) {
        updates.insert(UPDATED_AT_FIELD.to_string(), json!(stamp));
    }
    updates
}
