//! HTTP error type shared by every handler.
//!
//! Each variant fixes a status code and the `error` string of the JSON
//! body. Internal failures are logged with their cause and rendered with a
//! generic message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use edm_db::StoreError;
use edm_tutor::TutorError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// One failed input check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("Access token required")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    /// The message says what the caller is missing.
    #[error("Access denied")]
    Forbidden(String),
    /// Carries the full error text, e.g. "Course not found".
    #[error("{0}")]
    NotFound(String),
    #[error("{error}")]
    Conflict { error: String, message: String },
    #[error("Too many requests")]
    RateLimited,
    #[error("AI service rate limit exceeded")]
    AiRateLimited,
    #[error("Internal server error")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized
            | ApiError::InvalidCredentials
            | ApiError::InvalidToken
            | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::RateLimited | ApiError::AiRateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn internal(cause: impl std::fmt::Display) -> Self {
        ApiError::Internal(cause.to_string())
    }

    fn message(&self) -> Option<String> {
        match self {
            ApiError::Unauthorized => Some("Provide a bearer token in the Authorization header".into()),
            ApiError::InvalidCredentials => Some("Email or password is incorrect".into()),
            ApiError::Forbidden(m) => Some(m.clone()),
            ApiError::Conflict { message, .. } => Some(message.clone()),
            ApiError::RateLimited => {
                Some("Too many requests from this IP, please try again later.".into())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
    timestamp: DateTime<Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(cause) = &self {
            error!(%cause, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            message: self.message(),
            details: match self {
                ApiError::Validation(details) => Some(details),
                _ => None,
            },
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("Resource"),
            StoreError::Conflict(msg) => ApiError::Conflict {
                error: "Conflict".into(),
                message: capitalize(&msg),
            },
            other => ApiError::internal(other),
        }
    }
}

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        if err.is_rate_limited() {
            ApiError::AiRateLimited
        } else {
            ApiError::internal(err)
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
