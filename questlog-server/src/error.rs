//! Error taxonomy
//!
//! `StoreError` comes out of the repositories, `GenerationError` out of the
//! text generator, and `ServiceError` is what services return and handlers
//! turn into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use questlog_core::calendar::CalendarError;
use questlog_core::daily::DailyError;
use questlog_core::profile::ProfileError;
use questlog_core::skills::{EvaluationError, ProposalError};
use questlog_core::stats::UnknownStat;
use serde_json::json;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Map a unique-key violation to `Constraint`, leave everything else alone
    pub fn from_sqlx_unique(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                return StoreError::Constraint(format!("{what} already exists"));
            }
        }
        StoreError::Sqlx(err)
    }
}

/// Error type for text generation
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("text generation is not configured")]
    Unavailable,
    #[error("generation request failed: {0}")]
    Http(reqwest::Error),
    #[error("generation API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation API returned no text")]
    EmptyResponse,
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs never reach logs or response bodies
        GenerationError::Http(err.without_url())
    }
}

/// Service-level failures, one variant per HTTP outcome class
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("operation already in progress")]
    InProgress,
    #[error("not enough points: have {have}, need {need}")]
    InsufficientPoints { have: u32, need: u32 },
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("storage failure: {0}")]
    Upstream(#[from] StoreError),
}

impl From<ProposalError> for ServiceError {
    fn from(err: ProposalError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<ProfileError> for ServiceError {
    fn from(err: ProfileError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<UnknownStat> for ServiceError {
    fn from(err: UnknownStat) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<CalendarError> for ServiceError {
    fn from(err: CalendarError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<DailyError> for ServiceError {
    fn from(err: DailyError) -> Self {
        match err {
            DailyError::AlreadyClaimed => ServiceError::Conflict(err.to_string()),
            DailyError::InvalidOffset(_) => ServiceError::Validation(err.to_string()),
        }
    }
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::InProgress => "operation_in_progress",
            ServiceError::InsufficientPoints { .. } => "insufficient_points",
            ServiceError::Generation(GenerationError::Unavailable) => "generation_unavailable",
            ServiceError::Generation(_) => "generation_failed",
            ServiceError::Evaluation(_) => "evaluation_failed",
            ServiceError::Upstream(_) => "upstream_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) | ServiceError::InProgress => StatusCode::CONFLICT,
            // Business rejection, not a transport failure
            ServiceError::InsufficientPoints { .. } => StatusCode::OK,
            ServiceError::Generation(GenerationError::Unavailable) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServiceError::Generation(_) | ServiceError::Evaluation(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Upstream(StoreError::Constraint(_)) => StatusCode::CONFLICT,
            ServiceError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        let body = json!({
            "success": false,
            "error": self.code(),
            "failure_reason": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServiceError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::NotFound("task".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::InProgress.status(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::InsufficientPoints { have: 0, need: 1 }.status(),
            StatusCode::OK
        );
        assert_eq!(
            ServiceError::Generation(GenerationError::EmptyResponse).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::Generation(GenerationError::Unavailable).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::Upstream(StoreError::Migration("v1".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(ServiceError::InProgress.code(), "operation_in_progress");
        assert_eq!(
            ServiceError::from(ProposalError::MissingName).code(),
            "validation"
        );
        assert_eq!(ServiceError::from(DailyError::AlreadyClaimed).code(), "conflict");
        assert_eq!(ServiceError::from(DailyError::InvalidOffset(9999)).code(), "validation");
    }
}
