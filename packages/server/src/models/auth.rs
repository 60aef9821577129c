use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for admin login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Shared admin password.
    #[schema(example = "change-me")]
    pub password: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthStatus {
    pub authenticated: bool,
}

/// Identifies which protected page a code is requested for.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest {
    #[schema(example = "6f1c2a")]
    pub session_id: String,
    #[schema(example = "/sms/send")]
    pub page_url: String,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResponse {
    /// Seconds until the code expires.
    #[schema(example = 300)]
    pub expires_in: u64,
    /// Seconds before another code may be requested.
    #[schema(example = 60)]
    pub resend_after: u64,
    /// Masked recipient, absent in dry-run mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_to: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub session_id: String,
    pub page_url: String,
    #[schema(example = "042917")]
    pub code: String,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    /// Send as `X-Verify-Token` on protected requests.
    pub token: String,
    #[schema(example = 43200)]
    pub expires_in: u64,
}

pub fn validate_send_code(payload: &SendCodeRequest) -> Result<(), AppError> {
    if payload.session_id.trim().is_empty() {
        return Err(AppError::Validation("sessionId is required".into()));
    }
    if payload.page_url.trim().is_empty() {
        return Err(AppError::Validation("pageUrl is required".into()));
    }
    if payload.session_id.len() > 128 || payload.page_url.len() > 512 {
        return Err(AppError::Validation("sessionId or pageUrl too long".into()));
    }
    Ok(())
}

pub fn validate_verify_code(payload: &VerifyCodeRequest) -> Result<(), AppError> {
    if payload.session_id.trim().is_empty() || payload.page_url.trim().is_empty() {
        return Err(AppError::Validation(
            "sessionId and pageUrl are required".into(),
        ));
    }
    let code = payload.code.trim();
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("code must be 6 digits".into()));
    }
    Ok(())
}
