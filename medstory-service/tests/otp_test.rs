//! One-time-code lifecycle: verification, replay, expiry, and the
//! full password-reset flow.

mod common;

use chrono::Utc;
use uuid::Uuid;

use common::{harness, register_request, wait_for_emails};
use medstory_service::models::{
    LoginRequest, OtpCode, OtpPurpose, ResetPasswordRequest, VerifyEmailRequest,
};
use medstory_service::services::ServiceError;
use medstory_service::store::{OtpRepo, UserRepo};

#[tokio::test]
async fn email_verification_consumes_the_code() {
    let h = harness();
    h.auth.register(register_request("v@example.com")).await.unwrap();

    let sent = wait_for_emails(&h.email, 1).await;
    let code = sent[0].1.clone();

    h.auth
        .verify_email(VerifyEmailRequest {
            email: "v@example.com".to_string(),
            otp: code.clone(),
        })
        .await
        .unwrap();

    let user = h.store.find_user_by_email("v@example.com").await.unwrap().unwrap();
    assert!(user.is_verified);

    // Replay of the consumed code is refused.
    let err = h
        .auth
        .verify_email(VerifyEmailRequest {
            email: "v@example.com".to_string(),
            otp: code,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UsedCode));
}

#[tokio::test]
async fn wrong_code_is_invalid_not_used() {
    let h = harness();
    h.auth.register(register_request("w@example.com")).await.unwrap();
    wait_for_emails(&h.email, 1).await;

    let err = h
        .auth
        .verify_email(VerifyEmailRequest {
            email: "w@example.com".to_string(),
            otp: "000000".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCode));
}

#[tokio::test]
async fn expired_code_is_rejected() {
    let h = harness();
    let user_id = Uuid::new_v4();
    let code = OtpCode::new(user_id, OtpPurpose::PasswordReset, "A1B2C3".to_string(), -1);
    h.store.create_otp(&code).await.unwrap();

    let found = h
        .store
        .find_matching_otp(user_id, OtpPurpose::PasswordReset.as_str(), "A1B2C3")
        .await
        .unwrap()
        .unwrap();
    assert!(found.is_expired_at(Utc::now()));
    assert!(!found.is_acceptable_at(Utc::now()));
}

#[tokio::test]
async fn password_reset_flow_rotates_credentials_and_sessions() {
    let h = harness();
    h.auth.register(register_request("r@example.com")).await.unwrap();
    wait_for_emails(&h.email, 1).await;

    let pair = h
        .auth
        .login(LoginRequest {
            email: "r@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
            device: None,
        })
        .await
        .unwrap();

    h.auth.forgot_password("r@example.com").await.unwrap();
    let sent = wait_for_emails(&h.email, 2).await;
    let reset_code = sent[1].1.clone();

    h.auth
        .reset_password(ResetPasswordRequest {
            email: "r@example.com".to_string(),
            otp: reset_code,
            new_password: "correct-horse-battery".to_string(),
        })
        .await
        .unwrap();

    // Old password no longer works, the new one does.
    let err = h
        .auth
        .login(LoginRequest {
            email: "r@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
            device: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));

    h.auth
        .login(LoginRequest {
            email: "r@example.com".to_string(),
            password: "correct-horse-battery".to_string(),
            device: None,
        })
        .await
        .unwrap();

    // Every pre-reset session was revoked.
    let err = h.auth.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::RevokedToken));
}

#[tokio::test]
async fn forgot_password_stays_silent_for_unknown_addresses() {
    let h = harness();
    h.auth.forgot_password("ghost@example.com").await.unwrap();

    // Nothing was issued or sent.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(h.email.sent.lock().unwrap().is_empty());
}
