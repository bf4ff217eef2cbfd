//! In-memory store for tests and local development.
//!
//! A single mutex guards each entity map, so the read-modify-write
//! operations (`rotate_refresh_token`, `consume_link_use`, `mark_otp_used`) are atomic here
//! exactly as the conditional updates are against Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{AccessLink, AuditLog, OtpCode, RefreshToken, TimelineItem, User};
use crate::services::ServiceError;

use super::{AccessLinkRepo, AuditRepo, OtpRepo, RefreshTokenRepo, TimelineRepo, UserRepo};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    refresh_tokens: Mutex<HashMap<Uuid, RefreshToken>>,
    access_links: Mutex<HashMap<Uuid, AccessLink>>,
    otp_codes: Mutex<HashMap<Uuid, OtpCode>>,
    timeline_items: Mutex<HashMap<Uuid, TimelineItem>>,
    audit_logs: Mutex<Vec<AuditLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audit entries recorded (test hook).
    pub fn audit_count(&self) -> usize {
        self.audit_logs.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), ServiceError> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ServiceError::EmailAlreadyRegistered);
        }
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn set_verified(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if let Some(u) = self.users.lock().unwrap().get_mut(&user_id) {
            u.is_verified = true;
        }
        Ok(())
    }

    async fn set_password_hash(&self, user_id: Uuid, hash: &str) -> Result<(), ServiceError> {
        if let Some(u) = self.users.lock().unwrap().get_mut(&user_id) {
            u.password_hash = Some(hash.to_string());
        }
        Ok(())
    }

    async fn set_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError> {
        if let Some(u) = self.users.lock().unwrap().get_mut(&user_id) {
            u.last_login_utc = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepo for MemoryStore {
    async fn create_refresh_token(&self, record: &RefreshToken) -> Result<(), ServiceError> {
        let mut tokens = self.refresh_tokens.lock().unwrap();
        if tokens.values().any(|t| t.token == record.token) {
            return Err(ServiceError::DuplicateToken);
        }
        tokens.insert(record.token_id, record.clone());
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, ServiceError> {
        let mut tokens = self.refresh_tokens.lock().unwrap();
        let record = tokens
            .values_mut()
            .find(|t| t.token == token)
            .ok_or(ServiceError::UnknownToken)?;

        if record.revoked {
            return Err(ServiceError::RevokedToken);
        }
        if record.is_expired_at(now) {
            return Err(ServiceError::ExpiredToken);
        }

        record.revoked = true;
        Ok(record.user_id)
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<bool, ServiceError> {
        let mut tokens = self.refresh_tokens.lock().unwrap();
        match tokens.values_mut().find(|t| t.token == token && !t.revoked) {
            Some(t) => {
                t.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let mut tokens = self.refresh_tokens.lock().unwrap();
        let mut revoked = 0;
        for t in tokens.values_mut() {
            if t.user_id == user_id && !t.revoked {
                t.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl AccessLinkRepo for MemoryStore {
    async fn create_link(&self, link: &AccessLink) -> Result<(), ServiceError> {
        self.access_links
            .lock()
            .unwrap()
            .insert(link.link_id, link.clone());
        Ok(())
    }

    async fn find_link_by_token(&self, token: &str) -> Result<Option<AccessLink>, ServiceError> {
        let links = self.access_links.lock().unwrap();
        Ok(links.values().find(|l| l.token == token).cloned())
    }

    async fn find_link_by_id(&self, link_id: Uuid) -> Result<Option<AccessLink>, ServiceError> {
        Ok(self.access_links.lock().unwrap().get(&link_id).cloned())
    }

    async fn list_links_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<AccessLink>, ServiceError> {
        let links = self.access_links.lock().unwrap();
        let mut out: Vec<AccessLink> = links
            .values()
            .filter(|l| l.owner_id == owner_id && !l.revoked)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(out)
    }

    async fn consume_link_use(
        &self,
        link_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let mut links = self.access_links.lock().unwrap();
        let link = match links.get_mut(&link_id) {
            Some(l) => l,
            None => return Ok(false),
        };
        if !link.is_redeemable_at(now) {
            return Ok(false);
        }
        link.use_count += 1;
        link.last_accessed_utc = Some(now);
        Ok(true)
    }

    async fn revoke_link(&self, link_id: Uuid) -> Result<(), ServiceError> {
        if let Some(l) = self.access_links.lock().unwrap().get_mut(&link_id) {
            l.revoked = true;
        }
        Ok(())
    }
}

#[async_trait]
impl OtpRepo for MemoryStore {
    async fn create_otp(&self, code: &OtpCode) -> Result<(), ServiceError> {
        self.otp_codes
            .lock()
            .unwrap()
            .insert(code.otp_id, code.clone());
        Ok(())
    }

    async fn find_matching_otp(
        &self,
        user_id: Uuid,
        purpose: &str,
        code: &str,
    ) -> Result<Option<OtpCode>, ServiceError> {
        let codes = self.otp_codes.lock().unwrap();
        let mut matching: Vec<&OtpCode> = codes
            .values()
            .filter(|c| c.user_id == user_id && c.purpose_code == purpose && c.code == code)
            .collect();
        matching.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(matching.first().map(|c| (*c).clone()))
    }

    async fn mark_otp_used(&self, otp_id: Uuid) -> Result<bool, ServiceError> {
        let mut codes = self.otp_codes.lock().unwrap();
        match codes.get_mut(&otp_id) {
            Some(c) if !c.used => {
                c.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TimelineRepo for MemoryStore {
    async fn create_timeline_item(&self, item: &TimelineItem) -> Result<(), ServiceError> {
        self.timeline_items
            .lock()
            .unwrap()
            .insert(item.item_id, item.clone());
        Ok(())
    }

    async fn list_timeline_for_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TimelineItem>, ServiceError> {
        let items = self.timeline_items.lock().unwrap();
        let mut out: Vec<TimelineItem> = items
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(out
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl AuditRepo for MemoryStore {
    async fn record_audit(&self, entry: &AuditLog) -> Result<(), ServiceError> {
        self.audit_logs.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
