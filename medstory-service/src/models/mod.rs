//! Data models for the medstory backend.

mod access_link;
mod audit_log;
mod otp_code;
mod refresh_token;
mod timeline_item;
mod user;

pub use access_link::{
    AccessLink, AccessLinkResponse, AccessType, CreateLinkRequest, LinkOutcome,
};
pub use audit_log::{AuditAction, AuditLog};
pub use otp_code::{OtpCode, OtpPurpose};
pub use refresh_token::RefreshToken;
pub use timeline_item::{ItemType, TimelineItem, TimelineItemResponse};
pub use user::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, TokenResponse,
    User, UserResponse, VerifyEmailRequest,
};
