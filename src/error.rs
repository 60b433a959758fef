use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error type shared by every handler and service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Not authenticated, or not a participant of the addressed match.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    #[error("please select personality traits first")]
    NoTraits,

    #[error("please set your gender to boy or girl in your profile")]
    InvalidGender,

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("you already have an active match")]
    AlreadyMatched,

    /// The requested transition is not allowed from the current state.
    #[error("{0}")]
    Conflict(String),

    #[error("no compatible matches found, try again later")]
    NoCandidates,

    #[error("no tasks available for these traits")]
    NoTasks,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) | ApiError::NoCandidates | ApiError::NoTasks => {
                StatusCode::NOT_FOUND
            }
            ApiError::Validation(_)
            | ApiError::NoTraits
            | ApiError::InvalidGender
            | ApiError::InvalidAction(_) => StatusCode::BAD_REQUEST,
            ApiError::AlreadyMatched | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::NoTraits => "no_traits",
            ApiError::InvalidGender => "invalid_gender",
            ApiError::InvalidAction(_) => "invalid_action",
            ApiError::AlreadyMatched => "already_matched",
            ApiError::Conflict(_) => "conflict",
            ApiError::NoCandidates => "no_candidates",
            ApiError::NoTasks => "no_tasks",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = ?e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: message,
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
