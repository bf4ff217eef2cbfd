//! Storage layer: repository traits per entity plus Postgres and
//! in-memory implementations.
//!
//! The lifecycle services only ever see these traits and plain data
//! records, so the core policy logic is independent of the persistence
//! technology. The Postgres implementation guarantees the atomicity of
//! `rotate_refresh_token` and `consume_link_use` via row locking /
//! conditional updates; the in-memory implementation gives tests the
//! same guarantees with a mutex.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::Database;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AccessLink, AuditLog, OtpCode, RefreshToken, TimelineItem, User};
use crate::services::ServiceError;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError>;
    async fn create_user(&self, user: &User) -> Result<(), ServiceError>;
    async fn set_verified(&self, user_id: Uuid) -> Result<(), ServiceError>;
    async fn set_password_hash(&self, user_id: Uuid, hash: &str) -> Result<(), ServiceError>;
    async fn set_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    /// Persist a new active entry. Fails with `DuplicateToken` if the
    /// token value is already recorded - never silently overwrites.
    async fn create_refresh_token(&self, record: &RefreshToken) -> Result<(), ServiceError>;

    /// Atomically validate and revoke the presented token, returning
    /// the owning user. Fails with `UnknownToken`, `RevokedToken` or
    /// `ExpiredToken`. The revocation is committed before this returns,
    /// so a replay of the same value can never succeed a second time.
    async fn rotate_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, ServiceError>;

    /// Revoke a single token by value. Returns whether a live entry
    /// was found.
    async fn revoke_refresh_token(&self, token: &str) -> Result<bool, ServiceError>;

    /// Bulk-revoke all active entries for a user (logout-everywhere,
    /// password change). Returns the number of entries revoked.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, ServiceError>;
}

#[async_trait]
pub trait AccessLinkRepo: Send + Sync {
    async fn create_link(&self, link: &AccessLink) -> Result<(), ServiceError>;
    async fn find_link_by_token(&self, token: &str) -> Result<Option<AccessLink>, ServiceError>;
    async fn find_link_by_id(&self, link_id: Uuid) -> Result<Option<AccessLink>, ServiceError>;
    async fn list_links_for_owner(&self, owner_id: Uuid)
        -> Result<Vec<AccessLink>, ServiceError>;

    /// Atomically consume one use of a link: increments `use_count`
    /// and stamps `last_accessed_utc` only while the link is still
    /// redeemable. Returns false when the guard no longer holds, i.e.
    /// a concurrent redeemer won the race or the link went terminal.
    async fn consume_link_use(
        &self,
        link_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError>;

    /// Mark a link revoked. Idempotent.
    async fn revoke_link(&self, link_id: Uuid) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait OtpRepo: Send + Sync {
    async fn create_otp(&self, code: &OtpCode) -> Result<(), ServiceError>;

    /// Find the most recent code matching (user, purpose, value),
    /// used or not, so the caller can distinguish replay from a code
    /// that never existed.
    async fn find_matching_otp(
        &self,
        user_id: Uuid,
        purpose: &str,
        code: &str,
    ) -> Result<Option<OtpCode>, ServiceError>;

    /// Flip `used` on an unused code. Returns false if the code was
    /// already consumed, making single-use hold under replay.
    async fn mark_otp_used(&self, otp_id: Uuid) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait TimelineRepo: Send + Sync {
    async fn create_timeline_item(&self, item: &TimelineItem) -> Result<(), ServiceError>;
    async fn list_timeline_for_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TimelineItem>, ServiceError>;
}

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn record_audit(&self, entry: &AuditLog) -> Result<(), ServiceError>;
}

/// Full storage surface. Both backends implement every repository, so
/// services hold a single `Arc<dyn Store>`.
pub trait Store:
    UserRepo + RefreshTokenRepo + AccessLinkRepo + OtpRepo + TimelineRepo + AuditRepo
{
}

impl<T> Store for T where
    T: UserRepo + RefreshTokenRepo + AccessLinkRepo + OtpRepo + TimelineRepo + AuditRepo
{
}
