//! Timeline handlers: paging through and posting entries.

use axum::{
    extract::{Json, Multipart, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::middleware::AuthUser;
use crate::models::{ItemType, TimelineItemResponse};
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

/// Page through the caller's timeline, newest first.
///
/// GET /api/timeline
pub async fn get_timeline(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Vec<TimelineItemResponse>>, AppError> {
    let items = state
        .timeline
        .list(user.user_id, query.skip, query.limit)
        .await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Post a timeline entry. Multipart fields: `item_type` (required),
/// `text`, `file` (required for image/report entries).
///
/// POST /api/timeline
pub async fn post_timeline(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<TimelineItemResponse>), AppError> {
    let mut item_type: Option<ItemType> = None;
    let mut text: Option<String> = None;
    let mut file: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("item_type") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.to_string())))?;
                item_type = Some(
                    value
                        .parse()
                        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?,
                );
            }
            Some("text") => {
                text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.to_string())))?,
                );
            }
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.to_string())))?;
                file = Some((bytes.to_vec(), name));
            }
            _ => {}
        }
    }

    let item_type =
        item_type.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("item_type is required")))?;

    let item = state
        .timeline
        .post(user.user_id, item_type, text, file)
        .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}
