pub mod auth;
pub mod email;
pub mod error;
pub mod jwt;
pub mod links;
pub mod otp;
pub mod storage;
pub mod timeline;

pub use auth::AuthService;
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use jwt::{Claims, JwtService, TokenKind};
pub use links::LinkService;
pub use otp::OtpService;
pub use storage::{LocalStorage, Storage};
pub use timeline::TimelineService;
