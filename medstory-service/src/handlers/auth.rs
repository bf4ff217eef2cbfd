//! Authentication handlers: registration, email verification, login,
//! refresh rotation, logout, password reset.

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::handlers::MessageResponse;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, TokenResponse,
    UserResponse, VerifyEmailRequest,
};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// Token refresh request.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Register a new user.
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Verify an email address with the emailed code.
///
/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.verify_email(req).await?;
    Ok(Json(MessageResponse {
        message: "Email verified".to_string(),
    }))
}

/// Login with email and password.
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = state.auth.login(req).await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a fresh pair. The presented token is
/// revoked in the same operation.
///
/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(tokens))
}

/// Revoke the presented refresh token.
///
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.logout(&req.refresh_token).await?;
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// Start the password-reset flow. Always answers the same way so the
/// endpoint never confirms whether an address is registered.
///
/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.forgot_password(&req.email).await?;
    Ok(Json(MessageResponse {
        message: "If the address is registered, a reset code has been sent".to_string(),
    }))
}

/// Finish the password-reset flow.
///
/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.reset_password(req).await?;
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}
