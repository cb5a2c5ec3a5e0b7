//! Point grants (purchases, rewards, admin top-ups).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use barbcut_core::error::CoreError;
use barbcut_db::repositories::UserRepo;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GrantPointsRequest {
    #[validate(range(min = 1, message = "amount must be a positive number."))]
    pub amount: i64,
    /// Free-form origin of the grant, logged only.
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GrantPointsResponse {
    pub success: bool,
    pub granted: i64,
}

/// POST /api/v1/users/{uid}/points
///
/// Callers may grant to themselves; admins may grant to anyone.
pub async fn grant_points(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<GrantPointsRequest>, JsonRejection>,
) -> AppResult<Json<GrantPointsResponse>> {
    if auth.user_id != user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot grant points to another user".into(),
        )));
    }
    let Json(input) = payload?;
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let balance = UserRepo::grant_points(&state.store, &user_id, input.amount, Utc::now()).await?;
    tracing::info!(
        user_id = %user_id,
        granted_by = %auth.user_id,
        amount = input.amount,
        balance,
        source = input.source.as_deref().unwrap_or("unspecified"),
        "Points granted"
    );

    Ok(Json(GrantPointsResponse {
        success: true,
        granted: input.amount,
    }))
}
