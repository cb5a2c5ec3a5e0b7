use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use barbcut_core::error::CoreError;
use barbcut_db::DbError;
use barbcut_pipeline::IngestError;
use serde::Serialize;

/// Error returned by every handler.
///
/// Serialized as `{ "error": message, "code": CODE }`. Clients branch on
/// `code`; the message is for humans.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] DbError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Body extraction failures get the same `{error, code}` shape as every
/// other error instead of axum's plain-text rejection.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Stable failure classes exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCode {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Conflict,
    FailedPrecondition,
    Internal,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Internal details are logged, never sent.
fn internal(detail: &dyn std::fmt::Display) -> (ErrorCode, String) {
    tracing::error!(error = %detail, "Request failed with an internal error");
    (ErrorCode::Internal, "An internal error occurred".to_string())
}

impl AppError {
    fn classify(&self) -> (ErrorCode, String) {
        match self {
            AppError::Core(err) => classify_core(err),
            AppError::Ingest(IngestError::Unauthenticated(msg)) => {
                (ErrorCode::Unauthenticated, msg.clone())
            }
            AppError::Ingest(IngestError::FailedPrecondition(msg)) => {
                (ErrorCode::FailedPrecondition, msg.clone())
            }
            AppError::Ingest(IngestError::InvalidArgument(msg)) => {
                (ErrorCode::InvalidArgument, msg.clone())
            }
            AppError::Ingest(IngestError::Store(err)) | AppError::Store(err) => classify_store(err),
            AppError::BadRequest(msg) => (ErrorCode::InvalidArgument, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, error) = self.classify();
        let body = ErrorBody {
            error,
            code: code.as_str(),
        };
        (code.status(), Json(body)).into_response()
    }
}

fn classify_core(err: &CoreError) -> (ErrorCode, String) {
    match err {
        CoreError::NotFound { .. } => (ErrorCode::NotFound, err.to_string()),
        CoreError::Validation(msg) => (ErrorCode::InvalidArgument, msg.clone()),
        CoreError::FailedPrecondition(msg) => (ErrorCode::FailedPrecondition, msg.clone()),
        CoreError::Conflict(msg) => (ErrorCode::Conflict, msg.clone()),
        CoreError::Unauthenticated(msg) => (ErrorCode::Unauthenticated, msg.clone()),
        CoreError::Forbidden(msg) => (ErrorCode::PermissionDenied, msg.clone()),
        CoreError::Internal(msg) => internal(msg),
    }
}

/// Domain errors carried through the store keep their class.
fn classify_store(err: &DbError) -> (ErrorCode, String) {
    match err {
        DbError::Core(core) => classify_core(core),
        DbError::NotFound { collection, id } => {
            (ErrorCode::NotFound, format!("{collection}/{id} not found"))
        }
        other => internal(other),
    }
}
