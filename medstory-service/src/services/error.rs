use service_core::error::AppError;
use thiserror::Error;

/// Typed failures surfaced by the token, link, and OTP lifecycle
/// services. These are policy decisions, not transient faults, and are
/// never retried internally.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    // Signed-credential failures (access/refresh JWTs).
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Expired credential")]
    ExpiredCredential,

    // Refresh-token store failures.
    #[error("Unknown refresh token")]
    UnknownToken,

    #[error("Refresh token already revoked")]
    RevokedToken,

    #[error("Refresh token expired")]
    ExpiredToken,

    #[error("Refresh token value already recorded")]
    DuplicateToken,

    // Access-link failures.
    #[error("Link not found")]
    LinkNotFound,

    #[error("Link revoked")]
    LinkRevoked,

    #[error("Link expired")]
    LinkExpired,

    #[error("Link usage quota exhausted")]
    LinkExhausted,

    #[error("Not authorized for this resource")]
    Forbidden,

    // One-time-code failures.
    #[error("Invalid code")]
    InvalidCode,

    #[error("Code expired")]
    ExpiredCode,

    #[error("Code already used")]
    UsedCode,

    // Account flow failures.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("User not found")]
    UserNotFound,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),

            ServiceError::InvalidCredential => {
                AppError::AuthError(anyhow::anyhow!("Could not validate credentials"))
            }
            ServiceError::ExpiredCredential => {
                AppError::AuthError(anyhow::anyhow!("Credential expired"))
            }

            // Rotation failures are terminal for the request; the
            // client must fully re-authenticate. None of them reveal
            // which check failed beyond what the client already knows.
            ServiceError::UnknownToken
            | ServiceError::RevokedToken
            | ServiceError::ExpiredToken => {
                AppError::AuthError(anyhow::anyhow!("Could not validate credentials"))
            }
            ServiceError::DuplicateToken => {
                AppError::Conflict(anyhow::anyhow!("Token already recorded"))
            }

            ServiceError::LinkNotFound => AppError::NotFound(anyhow::anyhow!("Invalid link")),
            ServiceError::LinkRevoked => AppError::Gone(anyhow::anyhow!("Link revoked")),
            ServiceError::LinkExpired => AppError::Gone(anyhow::anyhow!("Link expired")),
            ServiceError::LinkExhausted => AppError::Gone(anyhow::anyhow!("Link used")),
            ServiceError::Forbidden => AppError::Forbidden(anyhow::anyhow!("Not authorized")),

            ServiceError::InvalidCode => AppError::BadRequest(anyhow::anyhow!("Invalid OTP")),
            ServiceError::ExpiredCode => AppError::BadRequest(anyhow::anyhow!("OTP expired")),
            ServiceError::UsedCode => AppError::BadRequest(anyhow::anyhow!("OTP already used")),

            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Incorrect email or password"))
            }
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("User with this email already exists"))
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::InactiveUser => AppError::BadRequest(anyhow::anyhow!("Inactive user")),
            ServiceError::EmailError(e) => AppError::EmailError(e),
            ServiceError::ValidationError(e) => AppError::BadRequest(anyhow::anyhow!(e)),
        }
    }
}
