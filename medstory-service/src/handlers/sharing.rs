//! Access link handlers: create, list, revoke, and the public
//! redemption endpoint.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::{
    AccessLinkResponse, AccessType, AuditAction, AuditLog, CreateLinkRequest,
    TimelineItemResponse,
};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// What a link redemption yields. Authenticated links only point the
/// client at the login flow; one-time-public links serve the shared
/// timeline directly.
#[derive(Debug, Serialize)]
pub struct AccessOutcomeResponse {
    pub access_type: AccessType,
    pub requires_login: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineItemResponse>>,
}

/// Create an access link for the caller's timeline.
///
/// POST /api/links
pub async fn create_link(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateLinkRequest>,
) -> Result<(StatusCode, Json<AccessLinkResponse>), AppError> {
    let link = state.links.create(user.user_id, user.user_id, req).await?;

    let audit = AuditLog::new(
        AuditAction::AccessLinkCreated,
        Some(user.user_id),
        Some(link.link_id),
        None,
    );
    state.audit(audit);

    Ok((StatusCode::CREATED, Json(link.into())))
}

/// List the caller's live links.
///
/// GET /api/links
pub async fn list_links(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<AccessLinkResponse>>, AppError> {
    let links = state.links.list(user.user_id).await?;
    Ok(Json(links.into_iter().map(Into::into).collect()))
}

/// Revoke one of the caller's links.
///
/// DELETE /api/links/:link_id
pub async fn revoke_link(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(link_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.links.revoke(link_id, user.user_id).await?;

    let audit = AuditLog::new(
        AuditAction::AccessLinkRevoked,
        Some(user.user_id),
        Some(link_id),
        None,
    );
    state.audit(audit);

    Ok(StatusCode::NO_CONTENT)
}

/// Redeem a shared link. No authentication: the token in the path is
/// the capability.
///
/// GET /api/links/access/:token
pub async fn access_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<AccessOutcomeResponse>, AppError> {
    let outcome = state.links.redeem(&token, Utc::now()).await?;

    let timeline = match outcome.access_type {
        AccessType::Authenticated => None,
        AccessType::OneTimePublic => {
            let items = state.timeline.list(outcome.owner_id, 0, None).await?;
            Some(items.into_iter().map(Into::into).collect())
        }
    };

    let audit = AuditLog::new(
        AuditAction::TimelineAccessed,
        None,
        Some(outcome.owner_id),
        None,
    );
    state.audit(audit);

    Ok(Json(AccessOutcomeResponse {
        access_type: outcome.access_type,
        requires_login: outcome.requires_login,
        timeline,
    }))
}
