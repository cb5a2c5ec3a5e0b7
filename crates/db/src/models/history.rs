//! Generated-image history records.

use barbcut_core::position::Position;
use barbcut_core::types::{timestamp_format, DocId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Placeholder stored when no haircut or beard was selected.
pub const NOT_APPLICABLE: &str = "N/A";

/// One successfully generated image. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub user_id: UserId,
    pub image_url: String,
    pub haircut: String,
    pub beard: String,
    pub position: Position,
    pub job_id: DocId,
    #[serde(with = "timestamp_format")]
    pub generated_at: Timestamp,
    #[serde(with = "timestamp_format")]
    pub timestamp: Timestamp,
}
