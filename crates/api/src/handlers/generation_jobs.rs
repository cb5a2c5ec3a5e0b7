//! Handlers for the `/generation-jobs` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use barbcut_core::error::CoreError;
use barbcut_db::repositories::JobRepo;
use barbcut_pipeline::{create_job, CreateJobInput, IngestError};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/generation-jobs
///
/// Debit one credit and queue a job. Returns 201 with the job id.
///
/// The caller is checked before the body, so an anonymous request is
/// always 401 whatever it sent.
pub async fn create_generation_job(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    payload: Result<Json<CreateJobInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let identity = auth
        .as_ref()
        .map(AuthUser::identity)
        .ok_or_else(IngestError::unauthenticated)?;
    let Json(input) = payload?;
    let response = create_job(&state.store, Some(&identity), &input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/generation-jobs/{id}
///
/// Poll a job. Only its owner may read it.
pub async fn get_generation_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.store, &job_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id.clone(),
            })
        })?;

    if job.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another user's job".into(),
        )));
    }

    Ok(DataResponse::new(job))
}
