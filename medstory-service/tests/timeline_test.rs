//! Timeline posting and paging.

mod common;

use std::sync::Arc;
use uuid::Uuid;

use common::harness;
use medstory_service::models::ItemType;
use medstory_service::services::{LocalStorage, ServiceError, TimelineService};

async fn timeline(h: &common::TestHarness, dir: &tempfile::TempDir) -> TimelineService {
    let storage = LocalStorage::new(dir.path(), "/media".to_string())
        .await
        .unwrap();
    TimelineService::new(h.store.clone(), Arc::new(storage))
}

#[tokio::test]
async fn entries_come_back_newest_first_and_paged() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let timeline = timeline(&h, &dir).await;
    let user = Uuid::new_v4();

    for i in 0..5 {
        timeline
            .post(user, ItemType::Status, Some(format!("update {}", i)), None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let first_page = timeline.list(user, 0, Some(3)).await.unwrap();
    assert_eq!(first_page.len(), 3);
    assert_eq!(first_page[0].text.as_deref(), Some("update 4"));

    let second_page = timeline.list(user, 3, Some(3)).await.unwrap();
    assert_eq!(second_page.len(), 2);
    assert_eq!(second_page[1].text.as_deref(), Some("update 0"));
}

#[tokio::test]
async fn image_entries_require_a_file() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let timeline = timeline(&h, &dir).await;
    let user = Uuid::new_v4();

    let err = timeline
        .post(user, ItemType::Image, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let item = timeline
        .post(
            user,
            ItemType::Image,
            Some("x-ray".to_string()),
            Some((b"png-bytes".to_vec(), "xray.png".to_string())),
        )
        .await
        .unwrap();
    let url = item.image_url.unwrap();
    assert!(url.starts_with("/media/"));
    assert!(url.ends_with(".png"));
}

#[tokio::test]
async fn status_entries_require_text() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let timeline = timeline(&h, &dir).await;

    let err = timeline
        .post(Uuid::new_v4(), ItemType::Status, Some("  ".to_string()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn timelines_are_per_user() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let timeline = timeline(&h, &dir).await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    timeline
        .post(alice, ItemType::Status, Some("mine".to_string()), None)
        .await
        .unwrap();
    timeline
        .post(bob, ItemType::Status, Some("theirs".to_string()), None)
        .await
        .unwrap();

    let items = timeline.list(alice, 0, None).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text.as_deref(), Some("mine"));
}
