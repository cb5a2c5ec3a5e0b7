//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use barbcut_core::error::CoreError;
use barbcut_core::types::UserId;
use barbcut_pipeline::CallerIdentity;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

const ROLE_ADMIN: &str = "admin";

/// Caller identified by a valid HS256 bearer token.
///
/// As `Option<AuthUser>` a missing header yields `None`; a malformed or
/// invalid token is still rejected.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub role: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ROLE_ADMIN)
    }

    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity {
            user_id: self.user_id.clone(),
            role: self.role.clone(),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        <Self as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state)
            .await?
            .ok_or_else(|| unauthenticated("Missing Authorization header"))
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                unauthenticated("Invalid Authorization format. Expected: Bearer <token>")
            })?;

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthenticated("Invalid or expired token"))?;

        Ok(Some(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        }))
    }
}

fn unauthenticated(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthenticated(message.to_string()))
}
