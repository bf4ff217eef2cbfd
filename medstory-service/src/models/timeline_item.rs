//! Timeline item model - entries on a user's personal health timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Status,
    Image,
    Report,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Status => "status",
            ItemType::Image => "image",
            ItemType::Report => "report",
        }
    }

    /// Image and report entries carry an uploaded file.
    pub fn requires_file(&self) -> bool {
        matches!(self, ItemType::Image | ItemType::Report)
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(ItemType::Status),
            "image" => Ok(ItemType::Image),
            "report" => Ok(ItemType::Report),
            _ => Err(format!("Invalid item type: {}", s)),
        }
    }
}

/// Timeline item entity.
#[derive(Debug, Clone, FromRow)]
pub struct TimelineItem {
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub item_type_code: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl TimelineItem {
    pub fn new(
        user_id: Uuid,
        item_type: ItemType,
        text: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            item_id: Uuid::new_v4(),
            user_id,
            item_type_code: item_type.as_str().to_string(),
            text,
            image_url,
            created_utc: Utc::now(),
        }
    }
}

/// Timeline item response for API.
#[derive(Debug, Serialize)]
pub struct TimelineItemResponse {
    pub item_id: Uuid,
    pub item_type: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<TimelineItem> for TimelineItemResponse {
    fn from(i: TimelineItem) -> Self {
        Self {
            item_id: i.item_id,
            item_type: i.item_type_code,
            text: i.text,
            image_url: i.image_url,
            created_utc: i.created_utc,
        }
    }
}
