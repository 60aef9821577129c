use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::services::phone_lookup::LookupError;
use crate::services::sms::SmsError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    #[schema(example = false)]
    pub success: bool,
    /// Human-readable error description.
    #[schema(example = "name is required")]
    pub error: String,
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `UNAUTHORIZED`,
    /// `INVALID_CREDENTIALS`, `TOKEN_INVALID`, `NOT_FOUND`, `CONFLICT`,
    /// `CODE_INVALID`, `CODE_EXPIRED`, `CODE_LOCKED`, `RATE_LIMITED`,
    /// `UPSTREAM_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Attempts left before the verification code locks. Only set for `CODE_INVALID`.
    #[serde(rename = "remainingAttempts", skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Admin cookie missing or wrong.
    Unauthorized,
    InvalidCredentials,
    /// Verification token missing, unknown or expired.
    TokenInvalid,
    NotFound(String),
    Conflict(String),
    /// Wrong verification code.
    CodeMismatch {
        remaining_attempts: u32,
    },
    /// Verification code missing or past its lifetime.
    CodeExpired,
    /// Too many failed verification attempts.
    Locked(String),
    /// Rate limit exceeded. Contains seconds until retry is allowed.
    RateLimited {
        retry_after: u64,
    },
    /// A third-party service (SMS gateway, carrier lookup) failed.
    Upstream(String),
    Internal(String),
}

impl AppError {
    /// Human-readable message, as it would appear in the response body.
    pub fn into_message(self) -> String {
        self.status_and_body().2
    }

    fn status_and_body(self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Admin login required".into(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid password".into(),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid or expired verification token".into(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::CodeMismatch { remaining_attempts } => (
                StatusCode::BAD_REQUEST,
                "CODE_INVALID",
                format!("Incorrect code, {remaining_attempts} attempts remaining"),
            ),
            AppError::CodeExpired => (
                StatusCode::BAD_REQUEST,
                "CODE_EXPIRED",
                "Verification code expired or not requested".into(),
            ),
            AppError::Locked(msg) => (StatusCode::LOCKED, "CODE_LOCKED", msg),
            AppError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Try again in {} seconds", retry_after),
            ),
            AppError::Upstream(detail) => {
                tracing::warn!("Upstream error: {}", detail);
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", detail)
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = if let AppError::RateLimited { retry_after } = &self {
            Some(*retry_after)
        } else {
            None
        };
        let remaining_attempts = if let AppError::CodeMismatch { remaining_attempts } = &self {
            Some(*remaining_attempts)
        } else {
            None
        };

        let (status, code, error) = self.status_and_body();
        let body = ErrorBody {
            success: false,
            error,
            code,
            remaining_attempts,
        };

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidNumber(phone) => {
                AppError::Validation(format!("Invalid phone number: {phone}"))
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<SmsError> for AppError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Client(e) => AppError::Internal(e.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}
