//! Refresh token model - persisted renewal credentials.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Refresh token entity.
///
/// Rows are never deleted. Rotation and logout flip `revoked`, which
/// preserves an audit trail and makes replay of a rotated token
/// detectable.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expiry_utc: DateTime<Utc>,
    pub revoked: bool,
    pub device: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl RefreshToken {
    /// Create a new active refresh token expiring `expiry_days` from now.
    pub fn new(user_id: Uuid, token: String, expiry_days: i64, device: Option<String>) -> Self {
        Self::new_at(user_id, token, Utc::now() + Duration::days(expiry_days), device)
    }

    /// Create a refresh token with an explicit expiry instant.
    pub fn new_at(
        user_id: Uuid,
        token: String,
        expiry_utc: DateTime<Utc>,
        device: Option<String>,
    ) -> Self {
        Self {
            token_id: Uuid::new_v4(),
            user_id,
            token,
            expiry_utc,
            revoked: false,
            device,
            created_utc: Utc::now(),
        }
    }

    /// A token is usable for rotation iff not revoked and not expired.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expiry_utc > now
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_utc <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_usable() {
        let t = RefreshToken::new(Uuid::new_v4(), "tok".into(), 7, None);
        assert!(t.is_usable_at(Utc::now()));
    }

    #[test]
    fn expired_token_is_not_usable() {
        let t = RefreshToken::new_at(
            Uuid::new_v4(),
            "tok".into(),
            Utc::now() - Duration::days(1),
            None,
        );
        let now = Utc::now();
        assert!(t.is_expired_at(now));
        assert!(!t.is_usable_at(now));
    }

    #[test]
    fn revoked_token_is_not_usable() {
        let mut t = RefreshToken::new(Uuid::new_v4(), "tok".into(), 7, None);
        t.revoked = true;
        assert!(!t.is_usable_at(Utc::now()));
    }
}
