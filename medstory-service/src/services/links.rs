use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{AccessLink, AccessType, CreateLinkRequest, LinkOutcome};
use crate::services::ServiceError;
use crate::store::Store;

/// Access-link lifecycle: issuance, listing, redemption, revocation.
#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn Store>,
}

impl LinkService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 32 bytes of OS randomness, URL-safe base64 without padding.
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Create a link sharing `owner_id`'s timeline. One-time-public
    /// links pick up their quota/expiry defaults in the constructor.
    pub async fn create(
        &self,
        owner_id: Uuid,
        created_by_id: Uuid,
        req: CreateLinkRequest,
    ) -> Result<AccessLink, ServiceError> {
        let link = AccessLink::new(
            owner_id,
            created_by_id,
            Self::generate_token(),
            req.access_type,
            req.label,
            req.expires_at,
            req.max_uses,
        );
        self.store.create_link(&link).await?;

        tracing::info!(
            link_id = %link.link_id,
            owner_id = %owner_id,
            access_type = %link.access_type_code,
            "Access link created"
        );
        Ok(link)
    }

    /// List the caller's live links, newest first.
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<AccessLink>, ServiceError> {
        self.store.list_links_for_owner(owner_id).await
    }

    /// Redeem a link by its token value.
    ///
    /// Authenticated links are validated without touching quota; the
    /// caller still has to log in before the timeline is served.
    /// One-time-public links consume one use atomically, so N racing
    /// redemptions of a quota-1 link admit exactly one.
    pub async fn redeem(&self, token: &str, now: DateTime<Utc>) -> Result<LinkOutcome, ServiceError> {
        let link = self
            .store
            .find_link_by_token(token)
            .await?
            .ok_or(ServiceError::LinkNotFound)?;

        if link.revoked {
            return Err(ServiceError::LinkRevoked);
        }
        if link.is_expired_at(now) {
            return Err(ServiceError::LinkExpired);
        }

        match link.access_type() {
            AccessType::Authenticated => {
                if link.is_exhausted() {
                    return Err(ServiceError::LinkExhausted);
                }
            }
            AccessType::OneTimePublic => {
                // The conditional update re-checks the whole guard, so
                // the pre-checks above only improve the error message.
                if !self.store.consume_link_use(link.link_id, now).await? {
                    return Err(ServiceError::LinkExhausted);
                }
            }
        }

        let access_type = link.access_type();
        Ok(LinkOutcome {
            owner_id: link.owner_id,
            access_type,
            requires_login: access_type == AccessType::Authenticated,
        })
    }

    /// Revoke a link. Only the owner may revoke; revoking an already
    /// revoked link succeeds without effect.
    pub async fn revoke(&self, link_id: Uuid, caller_id: Uuid) -> Result<(), ServiceError> {
        let link = self
            .store
            .find_link_by_id(link_id)
            .await?
            .ok_or(ServiceError::LinkNotFound)?;

        if link.owner_id != caller_id {
            return Err(ServiceError::Forbidden);
        }

        self.store.revoke_link(link_id).await?;
        tracing::info!(link_id = %link_id, "Access link revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_distinct() {
        let a = LinkService::generate_token();
        let b = LinkService::generate_token();
        assert_ne!(a, b);
        // 32 bytes -> 43 base64url chars, no padding.
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
