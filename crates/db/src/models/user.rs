//! User profile fields this service touches.

use serde_json::Value;

use crate::document::Snapshot;

pub const POINTS_FIELD: &str = "points";

/// Credit balance stored on a user document.
///
/// A missing document, a missing field or a non-numeric value all read as 0.
pub fn points_of(snapshot: Option<&Snapshot>) -> i64 {
    snapshot
        .and_then(|s| s.field(POINTS_FIELD))
        .and_then(numeric)
        .unwrap_or(0)
}

fn numeric(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.floor() as i64))
}

/// Canonical defaults applied to every user document.
pub mod defaults {
    pub const ROLE: &str = "customer";
    pub const IS_ACTIVE: bool = true;
    pub const FAVOURITES_COUNT: i64 = 0;
}
