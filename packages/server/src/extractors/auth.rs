use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the token issued by `/api/auth/verify-code`.
pub const VERIFY_TOKEN_HEADER: &str = "x-verify-token";

/// Request made with a valid admin login cookie.
///
/// Add this as a handler parameter to require the admin password login.
pub struct AdminUser;

/// Whether `jar` holds the admin cookie with the configured password.
pub fn is_admin(jar: &CookieJar, auth: &AuthConfig) -> bool {
    jar.get(&auth.cookie_name)
        .is_some_and(|c| !auth.admin_password.is_empty() && c.value() == auth.admin_password)
}

fn has_admin_cookie(parts: &Parts, state: &AppState) -> bool {
    is_admin(&CookieJar::from_headers(&parts.headers), &state.config.auth)
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if has_admin_cookie(parts, state) {
            Ok(AdminUser)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// Request carrying a valid verification token in `X-Verify-Token`.
///
/// The token alone is enough; the login cookie is not consulted.
pub struct VerifiedAdmin {
    pub token: String,
}

/// Read the verification token header, if present.
pub fn verify_token_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(VERIFY_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for VerifiedAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = verify_token_header(&parts.headers).ok_or(AppError::TokenInvalid)?;
        if !state.verification.validate_token(token) {
            return Err(AppError::TokenInvalid);
        }

        Ok(VerifiedAdmin {
            token: token.to_string(),
        })
    }
}
