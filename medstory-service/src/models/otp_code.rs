//! OTP code model - short-lived one-time verification codes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// OTP purpose codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::EmailVerification => "email_verification",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }

    /// Validity window for codes issued for this purpose.
    pub fn ttl_minutes(&self) -> i64 {
        match self {
            OtpPurpose::EmailVerification => 10,
            OtpPurpose::PasswordReset => 15,
        }
    }
}

/// OTP code entity.
#[derive(Debug, Clone, FromRow)]
pub struct OtpCode {
    pub otp_id: Uuid,
    pub user_id: Uuid,
    pub purpose_code: String,
    pub code: String,
    pub expiry_utc: DateTime<Utc>,
    pub used: bool,
    pub created_utc: DateTime<Utc>,
}

impl OtpCode {
    /// Create a new unused OTP code expiring `ttl_minutes` from now.
    pub fn new(user_id: Uuid, purpose: OtpPurpose, code: String, ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            otp_id: Uuid::new_v4(),
            user_id,
            purpose_code: purpose.as_str().to_string(),
            code,
            expiry_utc: now + Duration::minutes(ttl_minutes),
            used: false,
            created_utc: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_utc <= now
    }

    /// A code is acceptable iff unused and not expired.
    pub fn is_acceptable_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_code_is_acceptable() {
        let c = OtpCode::new(Uuid::new_v4(), OtpPurpose::EmailVerification, "A1B2C3".into(), 10);
        assert!(c.is_acceptable_at(Utc::now()));
    }

    #[test]
    fn used_code_is_rejected_even_before_expiry() {
        let mut c = OtpCode::new(Uuid::new_v4(), OtpPurpose::PasswordReset, "A1B2C3".into(), 15);
        c.used = true;
        assert!(!c.is_acceptable_at(Utc::now()));
        assert!(!c.is_expired_at(Utc::now()));
    }
}
