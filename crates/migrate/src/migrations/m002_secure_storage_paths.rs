//! Rewrite stored image URLs in style collections to bare storage paths.

use async_trait::async_trait;
use barbcut_core::storage::normalize_storage_path;
use barbcut_db::models::collections;
use barbcut_db::{ChunkedWriter, Document};
use serde_json::Value;

use crate::error::MigrationError;
use crate::{Migration, MigrationContext};

const TARGET_COLLECTIONS: [&str; 3] = [
    collections::STYLES,
    collections::HAIRCUTS,
    collections::BEARD_STYLES,
];

pub struct SecureStoragePaths;

#[async_trait]
impl Migration for SecureStoragePaths {
    fn id(&self) -> &'static str {
        "002_secure_storage_paths"
    }

    fn description(&self) -> &'static str {
        "Normalize image URLs to storage paths"
    }

    async fn up(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        for collection in TARGET_COLLECTIONS {
            let snapshots = ctx.store.list_collection(collection).await?;
            let mut writer = ChunkedWriter::new(ctx.store.as_ref());
            for snapshot in &snapshots {
                let updates = normalized_fields(&snapshot.data);
                if !updates.is_empty() {
                    writer.update(collection, &snapshot.id, updates).await?;
                }
            }
            let updated = writer.finish().await?;
            tracing::info!(collection, updated, "Storage paths normalized");
        }
        Ok(())
    }

    async fn down(&self, _ctx: &MigrationContext) -> Result<(), MigrationError> {
        tracing::info!("No rollback for 002_secure_storage_paths");
        Ok(())
    }
}

/// Fields of `data` whose image references changed. Empty when nothing
/// needs rewriting.
fn normalized_fields(data: &Document) -> Document {
    let mut updates = Document::new();

    if let Some(Value::String(url)) = data.get("imageUrl") {
        if let Some(path) = normalize_storage_path(url) {
            updates.insert("imageUrl".to_string(), Value::String(path));
        }
    }

    if let Some(Value::Object(images)) = data.get("images") {
        let mut normalized = images.clone();
        let mut changed = false;
        for value in normalized.values_mut() {
            changed |= normalize_in_place(value);
        }
        if changed {
            updates.insert("images".to_string(), Value::Object(normalized));
        }
    }

    if let Some(Value::Array(urls)) = data.get("imageUrls") {
        let mut normalized = urls.clone();
        let mut changed = false;
        for value in normalized.iter_mut() {
            changed |= normalize_in_place(value);
        }
        if changed {
            updates.insert("imageUrls".to_string(), Value::Array(normalized));
        }
    }

    updates
}

/// Rewrite a string value in place. Non-strings are left alone.
fn normalize_in_place(value: &mut Value) -> bool {
    let Value::String(url) = value else {
        return false;
    };
    match normalize_storage_path(url) {
        Some(path) => {
            *url = path;
            true
        }
        None => false,
    }
}
