//! Access link model - shareable timeline capabilities.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Access policy for a shared link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Holder must log in; validation never consumes quota.
    Authenticated,
    /// Anonymous single-shot access; each redemption consumes quota.
    OneTimePublic,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Authenticated => "authenticated",
            AccessType::OneTimePublic => "one_time_public",
        }
    }
}

impl std::str::FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authenticated" => Ok(AccessType::Authenticated),
            "one_time_public" => Ok(AccessType::OneTimePublic),
            _ => Err(format!("Invalid access type: {}", s)),
        }
    }
}

/// Access link entity.
///
/// Links are never deleted, only revoked. Expiry and quota exhaustion
/// are observed lazily at redemption time.
#[derive(Debug, Clone, FromRow)]
pub struct AccessLink {
    pub link_id: Uuid,
    pub owner_id: Uuid,
    pub created_by_id: Uuid,
    pub token: String,
    pub access_type_code: String,
    pub max_uses: Option<i32>,
    pub use_count: i32,
    pub expiry_utc: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub label: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub last_accessed_utc: Option<DateTime<Utc>>,
}

impl AccessLink {
    /// Create a new link, applying the one-time-public defaults: such
    /// links always carry a quota (default 1) and an expiry (default
    /// 24h from creation).
    pub fn new(
        owner_id: Uuid,
        created_by_id: Uuid,
        token: String,
        access_type: AccessType,
        label: Option<String>,
        expiry_utc: Option<DateTime<Utc>>,
        max_uses: Option<i32>,
    ) -> Self {
        let now = Utc::now();
        let (max_uses, expiry_utc) = match access_type {
            AccessType::OneTimePublic => (
                Some(max_uses.unwrap_or(1)),
                Some(expiry_utc.unwrap_or(now + Duration::hours(24))),
            ),
            AccessType::Authenticated => (max_uses, expiry_utc),
        };

        Self {
            link_id: Uuid::new_v4(),
            owner_id,
            created_by_id,
            token,
            access_type_code: access_type.as_str().to_string(),
            max_uses,
            use_count: 0,
            expiry_utc,
            revoked: false,
            label,
            created_utc: now,
            last_accessed_utc: None,
        }
    }

    pub fn access_type(&self) -> AccessType {
        self.access_type_code
            .parse()
            .unwrap_or(AccessType::Authenticated)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_utc.map_or(false, |e| e <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses.map_or(false, |m| self.use_count >= m)
    }

    /// A link is redeemable iff not revoked, not expired, and quota remains.
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now) && !self.is_exhausted()
    }
}

/// Request to create an access link.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    pub access_type: AccessType,
    #[validate(length(max = 256))]
    pub label: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
}

/// Access link response for API.
#[derive(Debug, Serialize)]
pub struct AccessLinkResponse {
    pub link_id: Uuid,
    pub token: String,
    pub access_type: AccessType,
    pub label: Option<String>,
    pub max_uses: Option<i32>,
    pub use_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<AccessLink> for AccessLinkResponse {
    fn from(l: AccessLink) -> Self {
        let access_type = l.access_type();
        Self {
            link_id: l.link_id,
            token: l.token,
            access_type,
            label: l.label,
            max_uses: l.max_uses,
            use_count: l.use_count,
            expires_at: l.expiry_utc,
            is_revoked: l.revoked,
            created_utc: l.created_utc,
        }
    }
}

/// Result of a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutcome {
    pub owner_id: Uuid,
    pub access_type: AccessType,
    pub requires_login: bool,
}
