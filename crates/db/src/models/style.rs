//! Haircut and beard style documents.

use std::collections::BTreeMap;

use barbcut_core::prompt::StyleFragment;
use barbcut_core::types::{timestamp_format, Timestamp};
use serde::{Deserialize, Serialize};

/// The fields of a `haircuts` / `beard_styles` record used for prompts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl StyleRecord {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    pub fn to_fragment(&self) -> StyleFragment {
        StyleFragment {
            name: self.name().unwrap_or_default().to_string(),
            description: self.description.clone(),
        }
    }
}

/// A `styles/{id}` document seeded from the bundled style catalogue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDocument {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub price: i64,
    pub price_display: String,
    pub duration_minutes: i64,
    pub duration_display: String,
    pub tags: Vec<String>,
    /// Angle key -> storage path.
    pub images: BTreeMap<String, String>,
    pub suitable_face_shapes: Vec<String>,
    pub maintenance_tips: Vec<String>,
    pub is_active: bool,
    #[serde(with = "timestamp_format")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp_format")]
    pub updated_at: Timestamp,
}
