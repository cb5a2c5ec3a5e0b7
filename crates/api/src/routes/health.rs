use axum::extract::State;
use axum::{routing::get, Json, Router};
use barbcut_db::models::collections;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the document store cannot be read.
    pub status: &'static str,
    pub version: &'static str,
    pub store_reachable: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = state
        .store
        .get(collections::MIGRATIONS, collections::MIGRATION_STATUS_ID)
        .await;
    if let Err(e) = &probe {
        tracing::warn!(error = %e, "Health probe could not read the document store");
    }

    Json(HealthResponse {
        status: if probe.is_ok() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store_reachable: probe.is_ok(),
    })
}

/// Root-level routes, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
