use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// Distinguishes the two token roles so an access token can never be
/// presented where a refresh token is expected, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email).
    pub sub: String,
    /// Token role.
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Unique token id. Keeps two tokens minted within the same second
    /// from colliding in the refresh-token store.
    pub jti: String,
}

/// JWT service for token generation and validation.
///
/// Tokens are signed HS256 with a process-wide secret; the refresh
/// token additionally lives in the store, which is what enforces
/// rotation and revocation.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    pub fn refresh_token_expiry_days(&self) -> i64 {
        self.refresh_token_expiry_days
    }

    /// Generate a short-lived access token for a user.
    pub fn issue_access_token(&self, email: &str) -> Result<String, ServiceError> {
        self.issue_access_token_at(email, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        self.issue(
            email,
            TokenKind::Access,
            now,
            Duration::minutes(self.access_token_expiry_minutes),
        )
    }

    /// Generate a long-lived refresh token for a user.
    pub fn issue_refresh_token(&self, email: &str) -> Result<String, ServiceError> {
        self.issue_refresh_token_at(email, Utc::now())
    }

    pub fn issue_refresh_token_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        self.issue(
            email,
            TokenKind::Refresh,
            now,
            Duration::days(self.refresh_token_expiry_days),
        )
    }

    fn issue(
        &self,
        email: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, ServiceError> {
        let claims = Claims {
            sub: email.to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Validate signature, expiry, and token role. Returns the claims
    /// on success. Expiry is checked with zero leeway so a token is
    /// rejected the instant it lapses.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::ExpiredCredential,
                _ => ServiceError::InvalidCredential,
            }
        })?;

        if data.claims.kind != expected {
            return Err(ServiceError::InvalidCredential);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "test-secret-please-change".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        })
    }

    #[test]
    fn access_token_round_trips() {
        let svc = service();
        let token = svc.issue_access_token("user@example.com").unwrap();
        let claims = svc.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "user@example.com");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn refresh_token_rejected_as_access() {
        let svc = service();
        let token = svc.issue_refresh_token("user@example.com").unwrap();
        let err = svc.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let past = Utc::now() - Duration::minutes(16);
        let token = svc.issue_access_token_at("user@example.com", past).unwrap();
        let err = svc.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, ServiceError::ExpiredCredential));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let mut token = svc.issue_access_token("user@example.com").unwrap();
        token.push('x');
        let err = svc.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential));
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let svc = service();
        let a = svc.issue_refresh_token("user@example.com").unwrap();
        let b = svc.issue_refresh_token("user@example.com").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let svc = service();
        let other = JwtService::new(&JwtConfig {
            secret: "a-different-secret".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        });
        let token = svc.issue_access_token("user@example.com").unwrap();
        assert!(other.verify(&token, TokenKind::Access).is_err());
    }
}
