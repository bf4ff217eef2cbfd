//! Audit log model - security-relevant events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Register,
    VerifyEmail,
    LoginSuccess,
    Logout,
    PasswordReset,
    AccessLinkCreated,
    AccessLinkRevoked,
    TimelineAccessed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Register => "register",
            AuditAction::VerifyEmail => "verify_email",
            AuditAction::LoginSuccess => "login_success",
            AuditAction::Logout => "logout",
            AuditAction::PasswordReset => "password_reset",
            AuditAction::AccessLinkCreated => "access_link_created",
            AuditAction::AccessLinkRevoked => "access_link_revoked",
            AuditAction::TimelineAccessed => "timeline_accessed",
        }
    }
}

/// Audit log entity.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLog {
    pub audit_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action_code: String,
    pub resource_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        action: AuditAction,
        user_id: Option<Uuid>,
        resource_id: Option<Uuid>,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            user_id,
            action_code: action.as_str().to_string(),
            resource_id,
            ip_address,
            created_utc: Utc::now(),
        }
    }
}
