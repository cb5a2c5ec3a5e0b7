//! Job ingestion: validate, resolve styles, then debit and enqueue atomically.

use barbcut_core::error::CoreError;
use barbcut_core::points::COST_PER_GENERATION;
use barbcut_core::prompt::build_prompt;
use barbcut_core::scheduling::JobStatus;
use barbcut_core::types::{DocId, UserId};
use barbcut_db::models::job::NewJob;
use barbcut_db::models::style::StyleRecord;
use barbcut_db::repositories::{JobRepo, PhotoRepo, StyleRepo, UserRepo};
use barbcut_db::{run_transaction, DbError, SharedStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The authenticated caller, as established by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub role: Option<String>,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobInput {
    #[validate(length(min = 1, max = 128))]
    pub haircut_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub beard_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub success: bool,
    pub job_id: DocId,
    pub status: JobStatus,
    pub image_count: u32,
}

/// Caller-visible ingestion failures. None of these leave a job behind or
/// touch the balance.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(DbError),
}

impl From<DbError> for IngestError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(CoreError::FailedPrecondition(msg)) => Self::FailedPrecondition(msg),
            DbError::Core(CoreError::Validation(msg)) => Self::InvalidArgument(msg),
            other => Self::Store(other),
        }
    }
}

impl IngestError {
    /// The error for a call without a caller identity.
    pub fn unauthenticated() -> Self {
        Self::Unauthenticated("User must be authenticated to generate images.".to_string())
    }
}

const NO_PHOTOS_MESSAGE: &str = "Please upload at least one photo before generating.";

/// Enqueue a generation job for `caller`.
///
/// The balance check, the debit and the job insert share one transaction,
/// so a successful call charges exactly once and every failure charges
/// nothing.
pub async fn create_job(
    store: &SharedStore,
    caller: Option<&CallerIdentity>,
    input: &CreateJobInput,
) -> Result<CreateJobResponse, IngestError> {
    let caller = caller.ok_or_else(IngestError::unauthenticated)?;
    input
        .validate()
        .map_err(|e| IngestError::InvalidArgument(e.to_string()))?;

    let user_id = caller.user_id.clone();
    let haircut_id = non_blank(input.haircut_id.as_deref());
    let beard_id = non_blank(input.beard_id.as_deref());

    let haircut = match &haircut_id {
        Some(id) => resolve_style(StyleRepo::find_haircut(store, id).await, "haircut", id),
        None => None,
    };
    let beard = match &beard_id {
        Some(id) => resolve_style(StyleRepo::find_beard(store, id).await, "beard", id),
        None => None,
    };

    let reference_images = PhotoRepo::reference_images(store, &user_id).await?;
    if reference_images.count() == 0 {
        return Err(IngestError::FailedPrecondition(NO_PHOTOS_MESSAGE.to_string()));
    }

    let prompt = build_prompt(
        haircut.as_ref().map(StyleRecord::to_fragment).as_ref(),
        beard.as_ref().map(StyleRecord::to_fragment).as_ref(),
    );

    let mut job = NewJob::queued(&user_id, prompt, reference_images, Utc::now());
    job.haircut_id = haircut_id;
    job.haircut_name = haircut.as_ref().and_then(|h| h.name().map(str::to_string));
    job.beard_id = beard_id;
    job.beard_name = beard.as_ref().and_then(|b| b.name().map(str::to_string));
    let image_count = job.image_count;

    let job_id = run_transaction(store, move |tx| {
        let user_id = user_id.clone();
        let job = job.clone();
        Box::pin(async move {
            let remaining =
                UserRepo::debit_in(tx, &user_id, COST_PER_GENERATION, Utc::now()).await?;
            let job_id = JobRepo::create_in(tx, &job)?;
            tracing::debug!(user_id = %user_id, remaining, "Balance debited");
            Ok::<_, IngestError>(job_id)
        })
    })
    .await?;

    tracing::info!(
        job_id = %job_id,
        user_id = %caller.user_id,
        image_count,
        "Generation job queued"
    );

    Ok(CreateJobResponse {
        success: true,
        job_id,
        status: JobStatus::Queued,
        image_count,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Style lookups are best-effort: failures only drop the description.
fn resolve_style(
    lookup: Result<Option<StyleRecord>, DbError>,
    kind: &'static str,
    id: &str,
) -> Option<StyleRecord> {
    match lookup {
        Ok(Some(record)) => Some(record),
        Ok(None) => {
            tracing::warn!(kind, id, "Style not found, continuing without it");
            None
        }
        Err(e) => {
            tracing::warn!(kind, id, error = %e, "Style lookup failed, continuing without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_longer_than_128_chars_are_rejected() {
        let input = CreateJobInput {
            haircut_id: Some("x".repeat(129)),
            beard_id: None,
        };
        assert!(input.validate().is_err());
        assert!(CreateJobInput::default().validate().is_ok());
    }

    #[test]
    fn admin_role_is_recognized() {
        let mut caller = CallerIdentity::new("u1");
        assert!(!caller.is_admin());
        caller.role = Some("admin".into());
        assert!(caller.is_admin());
    }
}
