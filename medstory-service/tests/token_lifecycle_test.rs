//! Refresh-token lifecycle: rotation is single-use, expiry and
//! revocation are terminal, token values never collide.

mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{harness, register_request};
use medstory_service::models::{LoginRequest, RefreshToken};
use medstory_service::services::ServiceError;
use medstory_service::store::RefreshTokenRepo;

fn login_request(email: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: "hunter2hunter2".to_string(),
        device: None,
    }
}

#[tokio::test]
async fn refresh_rotation_is_single_use() {
    let h = harness();
    h.auth.register(register_request("a@example.com")).await.unwrap();
    let pair = h.auth.login(login_request("a@example.com")).await.unwrap();

    // First rotation succeeds and yields a different refresh token.
    let rotated = h.auth.refresh(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // Replaying the consumed token is rejected as revoked.
    let err = h.auth.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::RevokedToken));

    // The replacement is still live.
    h.auth.refresh(&rotated.refresh_token).await.unwrap();
}

#[tokio::test]
async fn expired_refresh_token_is_rejected_by_the_store() {
    let h = harness();
    let user_id = Uuid::new_v4();
    let record = RefreshToken::new_at(
        user_id,
        "expired-token".to_string(),
        Utc::now() - Duration::days(1),
        None,
    );
    h.store.create_refresh_token(&record).await.unwrap();

    let err = h.store.rotate_refresh_token("expired-token", Utc::now()).await.unwrap_err();
    assert!(matches!(err, ServiceError::ExpiredToken));

    // Expiry is evaluated against the supplied instant, so the same
    // token was still usable the day before.
    let user = h
        .store
        .rotate_refresh_token("expired-token", Utc::now() - Duration::days(2))
        .await
        .unwrap();
    assert_eq!(user, user_id);
}

#[tokio::test]
async fn unknown_token_is_distinguished_from_revoked() {
    let h = harness();
    let err = h.store.rotate_refresh_token("never-issued", Utc::now()).await.unwrap_err();
    assert!(matches!(err, ServiceError::UnknownToken));
}

#[tokio::test]
async fn duplicate_token_values_are_refused() {
    let h = harness();
    let first = RefreshToken::new(Uuid::new_v4(), "same-value".to_string(), 7, None);
    let second = RefreshToken::new(Uuid::new_v4(), "same-value".to_string(), 7, None);

    h.store.create_refresh_token(&first).await.unwrap();
    let err = h.store.create_refresh_token(&second).await.unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateToken));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let h = harness();
    h.auth.register(register_request("b@example.com")).await.unwrap();
    let pair = h.auth.login(login_request("b@example.com")).await.unwrap();

    h.auth.logout(&pair.refresh_token).await.unwrap();
    h.auth.logout(&pair.refresh_token).await.unwrap();
    h.auth.logout("never-issued").await.unwrap();

    let err = h.auth.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::RevokedToken));
}

#[tokio::test]
async fn bulk_revocation_kills_every_session() {
    let h = harness();
    h.auth.register(register_request("c@example.com")).await.unwrap();

    let phone = h
        .auth
        .login(LoginRequest {
            email: "c@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
            device: Some("phone".to_string()),
        })
        .await
        .unwrap();
    let laptop = h.auth.login(login_request("c@example.com")).await.unwrap();

    let user = h
        .store
        .rotate_refresh_token(&phone.refresh_token, Utc::now())
        .await
        .unwrap();
    // Rotation consumed one; the bulk revoke catches the other.
    let revoked = h.store.revoke_all_for_user(user).await.unwrap();
    assert_eq!(revoked, 1);

    let err = h.auth.refresh(&laptop.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::RevokedToken));
}

#[tokio::test]
async fn tampered_refresh_token_never_reaches_the_store() {
    let h = harness();
    h.auth.register(register_request("d@example.com")).await.unwrap();
    let pair = h.auth.login(login_request("d@example.com")).await.unwrap();

    let mut forged = pair.refresh_token.clone();
    forged.push('x');
    let err = h.auth.refresh(&forged).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredential));

    // The genuine token is untouched by the failed attempt.
    h.auth.refresh(&pair.refresh_token).await.unwrap();
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_identically() {
    let h = harness();
    h.auth.register(register_request("e@example.com")).await.unwrap();

    let wrong = h
        .auth
        .login(LoginRequest {
            email: "e@example.com".to_string(),
            password: "not-the-password".to_string(),
            device: None,
        })
        .await
        .unwrap_err();
    let unknown = h.auth.login(login_request("nobody@example.com")).await.unwrap_err();

    assert!(matches!(wrong, ServiceError::InvalidCredentials));
    assert!(matches!(unknown, ServiceError::InvalidCredentials));
}
