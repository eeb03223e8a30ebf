//! Custom error types and handling
//!
//! Defines the application's error type and its conversion to HTTP
//! responses for the Axum framework.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    AuthFailed,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    // Contest state errors
    #[error("Contest not found")]
    ContestNotFound,

    #[error("Contest is closed")]
    ContestClosed,

    #[error("Contest is not running")]
    ContestNotRunning,

    #[error("You have already finished this contest")]
    AlreadyFinishedEarly,

    #[error("You are disqualified")]
    Disqualified,

    // Admission errors
    #[error("Language \"{0}\" is not allowed in this contest")]
    LanguageNotAllowed(String),

    #[error("Too many pending submissions, wait for a verdict")]
    TooManyPending,

    #[error("Time is over")]
    TimeOver,

    // Resource errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Judging errors
    #[error("No tests defined for this task")]
    NoTestsDefined,

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    // Persistence errors
    #[error("Database error: {0}")]
    Database(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    /// Stable machine-readable code for this error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthFailed => "not_authorized",
            Self::InvalidToken => "invalid_token",
            Self::Unauthorized => "not_authorized",
            Self::ContestNotFound => "contest_not_found",
            Self::ContestClosed => "contest_closed",
            Self::ContestNotRunning => "contest_not_running",
            Self::AlreadyFinishedEarly => "already_finished",
            Self::Disqualified => "disqualified",
            Self::LanguageNotAllowed(_) => "language_not_allowed",
            Self::TooManyPending => "too_many_pending",
            Self::TimeOver => "time_over",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Validation(_) | Self::InvalidInput(_) => "invalid_input",
            Self::NoTestsDefined => "no_tests_defined",
            Self::Sandbox(_) => "sandbox_error",
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// HTTP status for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthFailed | Self::InvalidToken | Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::ContestNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyPending => StatusCode::TOO_MANY_REQUESTS,
            Self::ContestClosed
            | Self::ContestNotRunning
            | Self::AlreadyFinishedEarly
            | Self::Disqualified
            | Self::LanguageNotAllowed(_)
            | Self::TimeOver
            | Self::Validation(_)
            | Self::InvalidInput(_)
            | Self::NoTestsDefined => StatusCode::BAD_REQUEST,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Sandbox(_) | Self::Database(_) | Self::Internal(_) | Self::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internals but do not expose details to clients
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "A database error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error: self.error_code().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::AlreadyExists("Row already exists".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AppError::InvalidToken
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Database(format!("JSON encoding: {}", err))
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
