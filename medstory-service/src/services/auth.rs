use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::models::{
    AuditAction, AuditLog, LoginRequest, OtpPurpose, RefreshToken, RegisterRequest,
    ResetPasswordRequest, TokenResponse, User, UserResponse, VerifyEmailRequest,
};
use crate::services::jwt::{JwtService, TokenKind};
use crate::services::otp::OtpService;
use crate::services::ServiceError;
use crate::store::Store;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Account and session lifecycle: registration, email verification,
/// login, refresh rotation, logout, password reset.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt: JwtService,
    otp: OtpService,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtService, otp: OtpService) -> Self {
        Self { store, jwt, otp }
    }

    /// Record an audit entry without holding up the request.
    fn audit(&self, entry: AuditLog) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_audit(&entry).await {
                tracing::error!(error = %e, "Failed to record audit entry");
            }
        });
    }

    /// Register a new account and send the verification code.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, ServiceError> {
        let hash = hash_password(&Password::new(req.password))?;
        let user = User::new(req.email, Some(hash.into_string()), req.full_name);

        // Unique-email enforcement lives in the store insert.
        self.store.create_user(&user).await?;

        self.otp
            .issue(user.user_id, &user.email, OtpPurpose::EmailVerification)
            .await?;

        tracing::info!(user_id = %user.user_id, "User registered");
        self.audit(AuditLog::new(
            AuditAction::Register,
            Some(user.user_id),
            None,
            None,
        ));

        Ok(user.sanitized())
    }

    /// Verify an email address with the emailed code.
    pub async fn verify_email(&self, req: VerifyEmailRequest) -> Result<(), ServiceError> {
        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCode)?;

        self.otp
            .verify(user.user_id, OtpPurpose::EmailVerification, &req.otp, Utc::now())
            .await?;

        self.store.set_verified(user.user_id).await?;

        tracing::info!(user_id = %user.user_id, "Email verified");
        self.audit(AuditLog::new(
            AuditAction::VerifyEmail,
            Some(user.user_id),
            None,
            None,
        ));
        Ok(())
    }

    /// Authenticate with email/password and mint a token pair.
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, ServiceError> {
        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !user.is_active {
            return Err(ServiceError::InvalidCredentials);
        }

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(hash.to_string()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        let now = Utc::now();
        let pair = self.issue_token_pair(&user, req.device, now).await?;
        self.store.set_last_login(user.user_id, now).await?;

        tracing::info!(user_id = %user.user_id, "Login succeeded");
        self.audit(AuditLog::new(
            AuditAction::LoginSuccess,
            Some(user.user_id),
            None,
            None,
        ));

        Ok(pair)
    }

    /// Rotate a refresh token: the presented token is revoked (and that
    /// revocation committed) before the replacement pair is minted, so
    /// every refresh token is single-use.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now();

        // Signature and expiry first, then the store-side state checks.
        self.jwt.verify(refresh_token, TokenKind::Refresh)?;

        let user_id = self.store.rotate_refresh_token(refresh_token, now).await?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !user.is_active {
            return Err(ServiceError::InvalidCredentials);
        }

        self.issue_token_pair(&user, None, now).await
    }

    /// Revoke the presented refresh token. Idempotent: revoking an
    /// unknown or already-revoked token still succeeds.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ServiceError> {
        let revoked = self.store.revoke_refresh_token(refresh_token).await?;
        if revoked {
            tracing::info!("Refresh token revoked on logout");
        }
        self.audit(AuditLog::new(AuditAction::Logout, None, None, None));
        Ok(())
    }

    /// Start the password-reset flow. Silently does nothing for an
    /// unknown email, so the endpoint can answer uniformly and never
    /// confirm whether an address is registered.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        if let Some(user) = self.store.find_user_by_email(email).await? {
            self.otp
                .issue(user.user_id, &user.email, OtpPurpose::PasswordReset)
                .await?;
        }
        Ok(())
    }

    /// Finish the password-reset flow: consume the code, install the
    /// new hash, and revoke every outstanding session.
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), ServiceError> {
        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCode)?;

        self.otp
            .verify(user.user_id, OtpPurpose::PasswordReset, &req.otp, Utc::now())
            .await?;

        let hash = hash_password(&Password::new(req.new_password))?;
        self.store
            .set_password_hash(user.user_id, hash.as_str())
            .await?;

        let revoked = self.store.revoke_all_for_user(user.user_id).await?;
        tracing::info!(user_id = %user.user_id, revoked, "Password reset");
        self.audit(AuditLog::new(
            AuditAction::PasswordReset,
            Some(user.user_id),
            None,
            None,
        ));
        Ok(())
    }

    async fn issue_token_pair(
        &self,
        user: &User,
        device: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse, ServiceError> {
        let access_token = self.jwt.issue_access_token_at(&user.email, now)?;
        let refresh_token = self.jwt.issue_refresh_token_at(&user.email, now)?;

        let record = RefreshToken::new_at(
            user.user_id,
            refresh_token.clone(),
            now + Duration::days(self.jwt.refresh_token_expiry_days()),
            device,
        );
        self.store.create_refresh_token(&record).await?;

        Ok(TokenResponse::new(
            access_token,
            refresh_token,
            self.jwt.access_token_expiry_seconds(),
        ))
    }
}
