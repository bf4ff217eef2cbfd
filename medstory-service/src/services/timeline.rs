use std::sync::Arc;
use uuid::Uuid;

use crate::models::{ItemType, TimelineItem};
use crate::services::storage::Storage;
use crate::services::ServiceError;
use crate::store::Store;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Personal timeline: posting entries (with optional media) and paging
/// through them, newest first.
#[derive(Clone)]
pub struct TimelineService {
    store: Arc<dyn Store>,
    storage: Arc<dyn Storage>,
}

impl TimelineService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn Storage>) -> Self {
        Self { store, storage }
    }

    /// Post a new entry. Status entries need text; image and report
    /// entries need an uploaded file.
    pub async fn post(
        &self,
        user_id: Uuid,
        item_type: ItemType,
        text: Option<String>,
        file: Option<(Vec<u8>, String)>,
    ) -> Result<TimelineItem, ServiceError> {
        if item_type.requires_file() && file.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Item type '{}' requires a file",
                item_type.as_str()
            )));
        }
        if item_type == ItemType::Status && text.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "Status entries require text".to_string(),
            ));
        }

        let image_url = match file {
            Some((bytes, name)) => Some(self.storage.upload(&bytes, &name).await?),
            None => None,
        };

        let item = TimelineItem::new(user_id, item_type, text, image_url);
        self.store.create_timeline_item(&item).await?;

        tracing::info!(item_id = %item.item_id, user_id = %user_id, "Timeline entry posted");
        Ok(item)
    }

    /// Page through a user's timeline, newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: Option<i64>,
    ) -> Result<Vec<TimelineItem>, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        self.store
            .list_timeline_for_user(user_id, skip.max(0), limit).await
    }
}
