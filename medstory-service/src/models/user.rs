//! User model - registered account holders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    /// Argon2 hash. None for externally-authenticated accounts.
    pub password_hash: Option<String>,
    pub full_name: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub mfa_secret: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub last_login_utc: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new unverified user.
    pub fn new(email: String, password_hash: Option<String>, full_name: String) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            password_hash,
            full_name,
            is_verified: false,
            is_active: true,
            mfa_secret: None,
            created_utc: Utc::now(),
            last_login_utc: None,
        }
    }

    /// Convert to sanitized response (no credential material).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// Request to register a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 256))]
    pub full_name: String,
}

/// Request to login with email/password.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    /// Optional client/device descriptor recorded with the session.
    pub device: Option<String>,
}

/// Request to verify an email address with an OTP code.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
}

/// Request to start the password reset flow.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Request to finish the password reset flow.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_verified: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            full_name: u.full_name,
            is_verified: u.is_verified,
            created_utc: u.created_utc,
        }
    }
}

/// Token pair response after successful auth.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl TokenResponse {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}
