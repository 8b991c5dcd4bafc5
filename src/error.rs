// src/error.rs

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Every authoring, lifecycle and store operation reports failures through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // 400 Bad Request (malformed payload)
    BadRequest(String),

    // 422 A draft or quiz metadata failed an invariant. Nothing was sent to the store.
    Validation(String),

    // 401 No identity was available for a write
    AuthenticationRequired,

    // 404 Record missing or owned by someone else. The two cases are reported identically.
    NotFoundOrForbidden,

    // 409 Conflict (duplicate access key, overlapping save)
    Conflict(String),

    // 422 Save or publish was attempted with no staged questions
    EmptyQuestionSet,

    // 500 The store rejected or failed a call. Carries the failed action, e.g. "Failed to save questions".
    Store(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Whether repeating the same call may succeed without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(_))
    }

    /// Replaces the action message of a store failure, leaving other errors untouched.
    pub fn with_action(self, action: &str) -> Self {
        match self {
            AppError::Store(_) => AppError::Store(action.to_string()),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) | AppError::Validation(msg) | AppError::Conflict(msg) => {
                write!(f, "{}", msg)
            }
            AppError::Store(action) => write!(f, "{}", action),
            AppError::AuthenticationRequired => write!(f, "Authentication required"),
            AppError::NotFoundOrForbidden => {
                write!(f, "Quiz not found or you don't have permission to edit it")
            }
            AppError::EmptyQuestionSet => write!(f, "No questions to save"),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) | AppError::EmptyQuestionSet => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AppError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::Store`.
/// Unique violations on the access key index become `Conflict`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict("Access key is already in use".to_string());
            }
        }
        tracing::error!("Store call failed: {:?}", err);
        AppError::Store(err.to_string())
    }
}

/// Every rejected JSON body (syntax, wrong shape, missing content type) is a 400.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
