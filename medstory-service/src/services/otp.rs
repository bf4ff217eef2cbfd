use chrono::{DateTime, Utc};
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{OtpCode, OtpPurpose};
use crate::services::email::EmailProvider;
use crate::services::ServiceError;
use crate::store::Store;

/// One-time-code lifecycle: issuance for email verification and
/// password reset, and single-use verification.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn Store>,
    email: Arc<dyn EmailProvider>,
}

impl OtpService {
    pub fn new(store: Arc<dyn Store>, email: Arc<dyn EmailProvider>) -> Self {
        Self { store, email }
    }

    /// Generate a 6-character uppercase hex code.
    fn generate_code() -> String {
        let mut bytes = [0u8; 3];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes).to_uppercase()
    }

    /// Issue a fresh code for the given purpose and email it. Each
    /// purpose carries its own validity window. The code is persisted
    /// before the send is attempted, and the send runs in the
    /// background so a slow SMTP relay never blocks the request.
    pub async fn issue(
        &self,
        user_id: Uuid,
        to_email: &str,
        purpose: OtpPurpose,
    ) -> Result<String, ServiceError> {
        let code = Self::generate_code();
        let record = OtpCode::new(user_id, purpose, code.clone(), purpose.ttl_minutes());
        self.store.create_otp(&record).await?;

        let email = self.email.clone();
        let to = to_email.to_string();
        let sent_code = code.clone();
        tokio::spawn(async move {
            let result = match purpose {
                OtpPurpose::EmailVerification => {
                    email.send_verification_email(&to, &sent_code).await
                }
                OtpPurpose::PasswordReset => {
                    email.send_password_reset_email(&to, &sent_code).await
                }
            };
            if let Err(e) = result {
                tracing::error!(error = %e, to = %to, "Failed to deliver OTP email");
            }
        });

        Ok(code)
    }

    /// Verify and consume a code. Each failure mode is distinct so the
    /// caller can audit replays separately from typos; the conditional
    /// `mark_used` is what makes single-use hold under a concurrent
    /// replay.
    pub async fn verify(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let record = self
            .store
            .find_matching_otp(user_id, purpose.as_str(), code)
            .await?
            .ok_or(ServiceError::InvalidCode)?;

        if record.used {
            return Err(ServiceError::UsedCode);
        }
        if record.is_expired_at(now) {
            return Err(ServiceError::ExpiredCode);
        }

        if !self.store.mark_otp_used(record.otp_id).await? {
            return Err(ServiceError::UsedCode);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::MockEmailService;
    use crate::store::{MemoryStore, OtpRepo};

    #[test]
    fn codes_are_six_uppercase_hex_chars() {
        for _ in 0..32 {
            let code = OtpService::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }

    #[tokio::test]
    async fn each_purpose_gets_its_own_validity_window() {
        let store = Arc::new(MemoryStore::new());
        let otp = OtpService::new(store.clone(), Arc::new(MockEmailService::new()));
        let user_id = Uuid::new_v4();

        let verify_code = otp
            .issue(user_id, "u@example.com", OtpPurpose::EmailVerification)
            .await
            .unwrap();
        let reset_code = otp
            .issue(user_id, "u@example.com", OtpPurpose::PasswordReset)
            .await
            .unwrap();

        let verify = store
            .find_matching_otp(user_id, OtpPurpose::EmailVerification.as_str(), &verify_code)
            .await
            .unwrap()
            .unwrap();
        let reset = store
            .find_matching_otp(user_id, OtpPurpose::PasswordReset.as_str(), &reset_code)
            .await
            .unwrap()
            .unwrap();

        assert_eq!((verify.expiry_utc - verify.created_utc).num_minutes(), 10);
        assert_eq!((reset.expiry_utc - reset.created_utc).num_minutes(), 15);
    }
}
