//! PostgreSQL store backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{AccessLink, AuditLog, OtpCode, RefreshToken, TimelineItem, User};
use crate::services::ServiceError;

use super::{AccessLinkRepo, AuditRepo, OtpRepo, RefreshTokenRepo, TimelineRepo, UserRepo};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.is_unique_violation()
    )
}

#[async_trait]
impl UserRepo for Database {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: &User) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, full_name, is_verified, is_active, mfa_secret, created_utc, last_login_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.is_verified)
        .bind(user.is_active)
        .bind(&user.mfa_secret)
        .bind(user.created_utc)
        .bind(user.last_login_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::EmailAlreadyRegistered
            } else {
                ServiceError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn set_verified(&self, user_id: Uuid) -> Result<(), ServiceError> {
        sqlx::query("UPDATE users SET is_verified = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_password_hash(&self, user_id: Uuid, hash: &str) -> Result<(), ServiceError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE user_id = $2")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError> {
        sqlx::query("UPDATE users SET last_login_utc = $1 WHERE user_id = $2")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepo for Database {
    async fn create_refresh_token(&self, record: &RefreshToken) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_id, user_id, token, expiry_utc, revoked, device, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.token_id)
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.expiry_utc)
        .bind(record.revoked)
        .bind(&record.device)
        .bind(record.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::DuplicateToken
            } else {
                ServiceError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, ServiceError> {
        let mut tx = self.pool.begin().await?;

        // Row lock so two concurrent rotations of the same value
        // serialize; the loser then observes revoked = TRUE.
        let record = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match record {
            None => return Err(ServiceError::UnknownToken),
            Some(r) if r.revoked => return Err(ServiceError::RevokedToken),
            Some(r) if r.is_expired_at(now) => return Err(ServiceError::ExpiredToken),
            Some(r) => r,
        };

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token_id = $1")
            .bind(record.token_id)
            .execute(&mut *tx)
            .await?;

        // The revocation must be durable before the caller mints a
        // replacement pair.
        tx.commit().await?;

        Ok(record.user_id)
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1 AND revoked = FALSE",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AccessLinkRepo for Database {
    async fn create_link(&self, link: &AccessLink) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO access_links
                (link_id, owner_id, created_by_id, token, access_type_code, max_uses,
                 use_count, expiry_utc, revoked, label, created_utc, last_accessed_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(link.link_id)
        .bind(link.owner_id)
        .bind(link.created_by_id)
        .bind(&link.token)
        .bind(&link.access_type_code)
        .bind(link.max_uses)
        .bind(link.use_count)
        .bind(link.expiry_utc)
        .bind(link.revoked)
        .bind(&link.label)
        .bind(link.created_utc)
        .bind(link.last_accessed_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_link_by_token(&self, token: &str) -> Result<Option<AccessLink>, ServiceError> {
        let link = sqlx::query_as::<_, AccessLink>("SELECT * FROM access_links WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    async fn find_link_by_id(&self, link_id: Uuid) -> Result<Option<AccessLink>, ServiceError> {
        let link =
            sqlx::query_as::<_, AccessLink>("SELECT * FROM access_links WHERE link_id = $1")
                .bind(link_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(link)
    }

    async fn list_links_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<AccessLink>, ServiceError> {
        let links = sqlx::query_as::<_, AccessLink>(
            "SELECT * FROM access_links WHERE owner_id = $1 AND revoked = FALSE ORDER BY created_utc DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn consume_link_use(
        &self,
        link_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        // Single conditional update: the WHERE clause re-checks the
        // full redeemability guard, so two concurrent redeemers of a
        // max_uses=1 link cannot both pass.
        let result = sqlx::query(
            r#"
            UPDATE access_links
            SET use_count = use_count + 1, last_accessed_utc = $2
            WHERE link_id = $1
              AND revoked = FALSE
              AND (expiry_utc IS NULL OR expiry_utc > $2)
              AND (max_uses IS NULL OR use_count < max_uses)
            "#,
        )
        .bind(link_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_link(&self, link_id: Uuid) -> Result<(), ServiceError> {
        sqlx::query("UPDATE access_links SET revoked = TRUE WHERE link_id = $1")
            .bind(link_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OtpRepo for Database {
    async fn create_otp(&self, code: &OtpCode) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (otp_id, user_id, purpose_code, code, expiry_utc, used, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(code.otp_id)
        .bind(code.user_id)
        .bind(&code.purpose_code)
        .bind(&code.code)
        .bind(code.expiry_utc)
        .bind(code.used)
        .bind(code.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_matching_otp(
        &self,
        user_id: Uuid,
        purpose: &str,
        code: &str,
    ) -> Result<Option<OtpCode>, ServiceError> {
        let record = sqlx::query_as::<_, OtpCode>(
            r#"
            SELECT * FROM otp_codes
            WHERE user_id = $1 AND purpose_code = $2 AND code = $3
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(purpose)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn mark_otp_used(&self, otp_id: Uuid) -> Result<bool, ServiceError> {
        let result =
            sqlx::query("UPDATE otp_codes SET used = TRUE WHERE otp_id = $1 AND used = FALSE")
                .bind(otp_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TimelineRepo for Database {
    async fn create_timeline_item(&self, item: &TimelineItem) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO timeline_items (item_id, user_id, item_type_code, text, image_url, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.item_id)
        .bind(item.user_id)
        .bind(&item.item_type_code)
        .bind(&item.text)
        .bind(&item.image_url)
        .bind(item.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_timeline_for_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TimelineItem>, ServiceError> {
        let items = sqlx::query_as::<_, TimelineItem>(
            r#"
            SELECT * FROM timeline_items
            WHERE user_id = $1
            ORDER BY created_utc DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

#[async_trait]
impl AuditRepo for Database {
    async fn record_audit(&self, entry: &AuditLog) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (audit_id, user_id, action_code, resource_id, ip_address, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.audit_id)
        .bind(entry.user_id)
        .bind(&entry.action_code)
        .bind(entry.resource_id)
        .bind(&entry.ip_address)
        .bind(entry.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
