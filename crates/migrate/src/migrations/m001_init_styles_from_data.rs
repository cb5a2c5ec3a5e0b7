//! Seed the `styles` collection from the bundled catalogue.
//!
//! `data.json` in the data directory lists the styles; each style names one
//! asset per angle. Assets found next to `data.json` are uploaded to
//! `styles/{id}/{angle}.png` and the document stores that storage path.
//! Assets that are missing locally keep their original path.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use barbcut_db::document::to_document;
use barbcut_db::models::collections;
use barbcut_db::models::style::StyleDocument;
use barbcut_db::ChunkedWriter;
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;

use crate::error::MigrationError;
use crate::{Migration, MigrationContext};

const DATA_FILE: &str = "data.json";
const STYLE_KIND: &str = "haircut";
const ASSET_CONTENT_TYPE: &str = "image/png";
const DEFAULT_PRICE: i64 = 0;
const DEFAULT_DURATION_MINUTES: i64 = 30;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("number pattern is valid"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogueStyle {
    id: String,
    name: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    description: String,
    /// Angle key (`front`, `left_side`, ...) -> asset path.
    #[serde(default)]
    images: BTreeMap<String, String>,
    #[serde(default)]
    suitable_face_shapes: Vec<String>,
    #[serde(default)]
    maintenance_tips: Vec<String>,
}

pub struct InitStylesFromData;

#[async_trait]
impl Migration for InitStylesFromData {
    fn id(&self) -> &'static str {
        "001_init_styles_from_data"
    }

    fn description(&self) -> &'static str {
        "Initialize styles collection from bundled data"
    }

    async fn up(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        let data_file = ctx.data_dir.join(DATA_FILE);
        if !tokio::fs::try_exists(&data_file).await? {
            tracing::warn!(path = %data_file.display(), "Style data file not found, nothing to import");
            return Ok(());
        }

        let raw = tokio::fs::read(&data_file).await?;
        let styles: Vec<CatalogueStyle> =
            serde_json::from_slice(&raw).map_err(|e| MigrationError::InvalidData {
                path: data_file.clone(),
                message: e.to_string(),
            })?;
        tracing::info!(count = styles.len(), "Loaded style catalogue");

        let mut writer = ChunkedWriter::new(ctx.store.as_ref());
        for style in styles {
            if ctx.store.get(collections::STYLES, &style.id).await?.is_some() {
                tracing::info!(style_id = %style.id, "Style already exists, skipping");
                continue;
            }

            let mut images = BTreeMap::new();
            for (angle, asset) in &style.images {
                let stored = upload_asset(ctx, &style.id, angle, asset).await?;
                images.insert(angle.clone(), stored);
            }

            let now = Utc::now();
            let document = StyleDocument {
                id: style.id.clone(),
                kind: STYLE_KIND.to_string(),
                description: style.description,
                price: first_number(&style.price).unwrap_or(DEFAULT_PRICE),
                price_display: style.price,
                duration_minutes: first_number(&style.duration).unwrap_or(DEFAULT_DURATION_MINUTES),
                duration_display: style.duration,
                tags: vec![tag_for(&style.name)],
                name: style.name,
                images,
                suitable_face_shapes: style.suitable_face_shapes,
                maintenance_tips: style.maintenance_tips,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            writer
                .set(collections::STYLES, &style.id, to_document(&document)?)
                .await?;
            tracing::info!(style_id = %style.id, "Style added");
        }

        let written = writer.finish().await?;
        tracing::info!(written, "Style import finished");
        Ok(())
    }

    async fn down(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        let styles = ctx.store.list_collection(collections::STYLES).await?;

        let mut writer = ChunkedWriter::new(ctx.store.as_ref());
        for style in &styles {
            let prefix = format!("styles/{}/", style.id);
            for path in ctx.blobs.list(&ctx.bucket, &prefix).await? {
                ctx.blobs.delete(&ctx.bucket, &path).await?;
            }
            writer.delete(collections::STYLES, &style.id).await?;
        }
        writer.finish().await?;

        tracing::info!(count = styles.len(), "Styles removed");
        Ok(())
    }
}

/// Upload one catalogue asset unless it is already in the bucket. Returns
/// the value to store in the style's `images` map.
async fn upload_asset(
    ctx: &MigrationContext,
    style_id: &str,
    angle: &str,
    asset: &str,
) -> Result<String, MigrationError> {
    let Some(file_name) = Path::new(asset).file_name() else {
        tracing::warn!(style_id, angle, asset, "Asset path has no file name");
        return Ok(asset.to_string());
    };
    let local = ctx.data_dir.join(file_name);
    if !tokio::fs::try_exists(&local).await? {
        tracing::warn!(style_id, angle, path = %local.display(), "Image not found, keeping original path");
        return Ok(asset.to_string());
    }

    let storage_path = format!("styles/{style_id}/{angle}.png");
    if ctx.blobs.exists(&ctx.bucket, &storage_path).await? {
        tracing::debug!(path = %storage_path, "Image already uploaded");
        return Ok(storage_path);
    }

    let bytes = tokio::fs::read(&local).await?;
    ctx.blobs
        .put(&ctx.bucket, &storage_path, bytes, ASSET_CONTENT_TYPE)
        .await?;
    tracing::info!(style_id, angle, path = %storage_path, "Image uploaded");
    Ok(storage_path)
}

fn first_number(value: &str) -> Option<i64> {
    FIRST_NUMBER.find(value)?.as_str().parse().ok()
}

fn tag_for(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_number() {
        assert_eq!(first_number("$25"), Some(25));
        assert_eq!(first_number("45 mins"), Some(45));
        assert_eq!(first_number("1 hr 30 min"), Some(1));
        assert_eq!(first_number("Free"), None);
    }

    #[test]
    fn tag_is_kebab_case() {
        assert_eq!(tag_for("Classic  Side Part"), "classic-side-part");
        assert_eq!(tag_for("Buzz"), "buzz");
    }
}
