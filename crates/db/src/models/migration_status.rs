//! The `_migrations/migration_status` singleton.

use barbcut_core::types::{timestamp_format, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    /// Number of the most recently applied migration; 0 = unmigrated.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub last_migration: Option<String>,
    #[serde(default, with = "timestamp_format::option")]
    pub timestamp: Option<Timestamp>,
}
