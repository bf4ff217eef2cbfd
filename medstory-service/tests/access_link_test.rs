//! Access-link lifecycle: one-time-public quota under concurrency,
//! expiry precedence, idempotent revocation, ownership checks.

mod common;

use chrono::{Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

use common::harness;
use medstory_service::models::{AccessType, CreateLinkRequest};
use medstory_service::services::{LinkService, ServiceError};
use medstory_service::store::AccessLinkRepo;

fn create_request(access_type: AccessType) -> CreateLinkRequest {
    CreateLinkRequest {
        access_type,
        label: None,
        expires_at: None,
        max_uses: None,
    }
}

#[tokio::test]
async fn concurrent_redemption_admits_exactly_one() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let owner = Uuid::new_v4();

    let link = links
        .create(owner, owner, create_request(AccessType::OneTimePublic))
        .await
        .unwrap();

    let links = Arc::new(links);
    let now = Utc::now();
    let attempts = (0..8).map(|_| {
        let links = links.clone();
        let token = link.token.clone();
        async move { links.redeem(&token, now).await }
    });

    let results = join_all(attempts).await;
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::LinkExhausted)))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(exhausted, 7);

    let stored = h.store.find_link_by_id(link.link_id).await.unwrap().unwrap();
    assert_eq!(stored.use_count, 1);
}

#[tokio::test]
async fn one_time_public_redemption_serves_without_login() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let owner = Uuid::new_v4();

    let link = links
        .create(owner, owner, create_request(AccessType::OneTimePublic))
        .await
        .unwrap();

    let outcome = links.redeem(&link.token, Utc::now()).await.unwrap();
    assert_eq!(outcome.owner_id, owner);
    assert_eq!(outcome.access_type, AccessType::OneTimePublic);
    assert!(!outcome.requires_login);
}

#[tokio::test]
async fn authenticated_links_never_consume_quota() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let owner = Uuid::new_v4();

    let link = links
        .create(owner, owner, create_request(AccessType::Authenticated))
        .await
        .unwrap();

    for _ in 0..3 {
        let outcome = links.redeem(&link.token, Utc::now()).await.unwrap();
        assert!(outcome.requires_login);
    }

    let stored = h.store.find_link_by_id(link.link_id).await.unwrap().unwrap();
    assert_eq!(stored.use_count, 0);
}

#[tokio::test]
async fn expiry_wins_over_remaining_quota() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let owner = Uuid::new_v4();

    let link = links
        .create(
            owner,
            owner,
            CreateLinkRequest {
                access_type: AccessType::OneTimePublic,
                label: None,
                expires_at: Some(Utc::now() - Duration::hours(1)),
                max_uses: Some(5),
            },
        )
        .await
        .unwrap();

    let err = links.redeem(&link.token, Utc::now()).await.unwrap_err();
    assert!(matches!(err, ServiceError::LinkExpired));

    let stored = h.store.find_link_by_id(link.link_id).await.unwrap().unwrap();
    assert_eq!(stored.use_count, 0);
}

#[tokio::test]
async fn explicit_quota_admits_that_many_uses() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let owner = Uuid::new_v4();

    let link = links
        .create(
            owner,
            owner,
            CreateLinkRequest {
                access_type: AccessType::OneTimePublic,
                label: Some("family".to_string()),
                expires_at: None,
                max_uses: Some(3),
            },
        )
        .await
        .unwrap();

    for _ in 0..3 {
        links.redeem(&link.token, Utc::now()).await.unwrap();
    }
    let err = links.redeem(&link.token, Utc::now()).await.unwrap_err();
    assert!(matches!(err, ServiceError::LinkExhausted));
}

#[tokio::test]
async fn revocation_is_owner_only_and_idempotent() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let link = links
        .create(owner, owner, create_request(AccessType::Authenticated))
        .await
        .unwrap();

    let err = links.revoke(link.link_id, stranger).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    links.revoke(link.link_id, owner).await.unwrap();
    links.revoke(link.link_id, owner).await.unwrap();

    let err = links.redeem(&link.token, Utc::now()).await.unwrap_err();
    assert!(matches!(err, ServiceError::LinkRevoked));
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let err = links.redeem("no-such-token", Utc::now()).await.unwrap_err();
    assert!(matches!(err, ServiceError::LinkNotFound));
}

#[tokio::test]
async fn listing_excludes_revoked_links() {
    let h = harness();
    let links = LinkService::new(h.store.clone());
    let owner = Uuid::new_v4();

    let keep = links
        .create(owner, owner, create_request(AccessType::Authenticated))
        .await
        .unwrap();
    let drop = links
        .create(owner, owner, create_request(AccessType::OneTimePublic))
        .await
        .unwrap();

    links.revoke(drop.link_id, owner).await.unwrap();

    let listed = links.list(owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].link_id, keep.link_id);
}
