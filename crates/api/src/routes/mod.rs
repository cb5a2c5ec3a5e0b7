pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{generation_jobs, points};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /generation-jobs          POST  create
/// /generation-jobs/{id}     GET   poll
/// /users/{uid}/points       POST  grant points
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/generation-jobs",
            post(generation_jobs::create_generation_job),
        )
        .route(
            "/generation-jobs/{id}",
            get(generation_jobs::get_generation_job),
        )
        .route("/users/{uid}/points", post(points::grant_points))
}
