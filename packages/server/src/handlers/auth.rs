use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, instrument, warn};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{is_admin, verify_token_header};
use crate::extractors::json::AppJson;
use crate::models::auth::*;
use crate::models::shared::{ApiResponse, MessageBody};
use crate::services::verification::{VerifyOutcome, code_key, generate_code};
use crate::state::AppState;
use crate::utils::phone::mask;

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in with the admin password",
    description = "Compares the password with the configured admin password and, on success, sets the HttpOnly admin cookie for 7 days.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthStatus>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }

    let auth = &state.config.auth;
    if auth.admin_password.is_empty() || payload.password != auth.admin_password {
        warn!("Admin login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let cookie = Cookie::build((auth.cookie_name.clone(), auth.admin_password.clone()))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(auth.cookie_max_age_days));

    info!("Admin logged in");
    Ok((
        jar.add(cookie),
        Json(ApiResponse::with_message(
            AuthStatus {
                authenticated: true,
            },
            "Logged in",
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Clear the admin cookie",
    responses((status = 200, description = "Logged out", body = MessageBody)),
)]
#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let cookie = Cookie::build(state.config.auth.cookie_name.clone()).path("/");
    (jar.remove(cookie), Json(MessageBody::new("Logged out")))
}

#[utoipa::path(
    get,
    path = "/check",
    tag = "Auth",
    operation_id = "checkAuth",
    summary = "Report whether the admin cookie is valid",
    responses((status = 200, description = "Login state", body = ApiResponse<AuthStatus>)),
)]
#[instrument(skip(state, jar))]
pub async fn check(State(state): State<AppState>, jar: CookieJar) -> Json<ApiResponse<AuthStatus>> {
    Json(ApiResponse::ok(AuthStatus {
        authenticated: is_admin(&jar, &state.config.auth),
    }))
}

#[utoipa::path(
    post,
    path = "/send-code",
    tag = "Auth",
    operation_id = "sendCode",
    summary = "Send a verification code",
    description = "Generates a 6-digit code for the session/page pair and sends it to the configured admin phone. \
        Without an SMS gateway the code is only written to the server log. One code per pair per minute.",
    request_body = SendCodeRequest,
    responses(
        (status = 200, description = "Code sent", body = ApiResponse<SendCodeResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 429, description = "Sent too recently (RATE_LIMITED)", body = ErrorBody),
        (status = 502, description = "SMS gateway failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(page_url = %payload.page_url))]
pub async fn send_code(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SendCodeRequest>,
) -> Result<Json<ApiResponse<SendCodeResponse>>, AppError> {
    validate_send_code(&payload)?;

    let key = code_key(payload.session_id.trim(), payload.page_url.trim());
    state
        .verification
        .check_send_rate(&key)
        .map_err(|retry_after| AppError::RateLimited { retry_after })?;

    let code = generate_code();
    state.verification.set_code(&key, &code);

    let content = format!(
        "您的验证码为{code}，{}分钟内有效，请勿泄露。",
        state.verification.code_ttl().as_secs() / 60
    );

    let sent_to = match state.sms.admin_phone() {
        Some(phone) if state.sms.is_live() => {
            if let Err(e) = state.sms.send(phone, &content).await {
                warn!(error = %e, "Verification code could not be delivered");
                state.verification.delete_code(&key);
                state.verification.clear_send_mark(&key);
                return Err(e.into());
            }
            Some(mask(phone))
        }
        _ => {
            // Dry run: the code only goes to the log.
            info!(code = %code, "Verification code generated (no SMS gateway)");
            None
        }
    };

    Ok(Json(ApiResponse::with_message(
        SendCodeResponse {
            expires_in: state.verification.code_ttl().as_secs(),
            resend_after: state.config.verification.send_interval_secs,
            sent_to,
        },
        "Verification code sent",
    )))
}

#[utoipa::path(
    post,
    path = "/verify-code",
    tag = "Auth",
    operation_id = "verifyCode",
    summary = "Exchange a verification code for a token",
    description = "Checks the code for the session/page pair. A match consumes the code and returns a token valid for 12 hours. \
        Five wrong attempts lock the code until it expires.",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Code accepted", body = ApiResponse<VerifyCodeResponse>),
        (status = 400, description = "Wrong (CODE_INVALID) or expired (CODE_EXPIRED) code", body = ErrorBody),
        (status = 423, description = "Too many attempts (CODE_LOCKED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(page_url = %payload.page_url))]
pub async fn verify_code(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyCodeRequest>,
) -> Result<Json<ApiResponse<VerifyCodeResponse>>, AppError> {
    validate_verify_code(&payload)?;

    let key = code_key(payload.session_id.trim(), payload.page_url.trim());
    match state.verification.verify_code(&key, payload.code.trim()) {
        VerifyOutcome::Verified => {
            let token = state.verification.issue_token();
            info!("Verification code accepted, token issued");
            Ok(Json(ApiResponse::ok(VerifyCodeResponse {
                token,
                expires_in: state.verification.token_ttl().as_secs(),
            })))
        }
        VerifyOutcome::Mismatch { remaining_attempts } => {
            Err(AppError::CodeMismatch { remaining_attempts })
        }
        VerifyOutcome::Expired | VerifyOutcome::Missing => Err(AppError::CodeExpired),
        VerifyOutcome::Locked => {
            warn!("Verification code locked after repeated failures");
            Err(AppError::Locked(
                "Too many failed attempts, request a new code later".into(),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/revoke-token",
    tag = "Auth",
    operation_id = "revokeToken",
    summary = "Revoke a verification token",
    params(("X-Verify-Token" = String, Header, description = "Token to revoke")),
    responses(
        (status = 200, description = "Token revoked", body = MessageBody),
        (status = 401, description = "Missing or unknown token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn revoke_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageBody>, AppError> {
    let token = verify_token_header(&headers).ok_or(AppError::TokenInvalid)?;

    if !state.verification.revoke_token(token) {
        return Err(AppError::TokenInvalid);
    }
    Ok(Json(MessageBody::new("Token revoked")))
}
